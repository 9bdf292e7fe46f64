use capm_cli::core::{CapmError, ItemId};
use capm_cli::installer::{InstallOptions, Installer};
use capm_cli::resolver::Resolver;
use capm_cli::target::Target;
use capm_cli::test_utils::Capsule;
use capm_cli::tracker::Tracker;
use std::fs;

use crate::common::TestEnv;

fn ids(raw: &[&str]) -> Vec<ItemId> {
    raw.iter().map(|s| s.parse().unwrap()).collect()
}

fn snapshot(dir: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = list_files(dir)
        .into_iter()
        .map(|p| (p.strip_prefix(dir).unwrap().display().to_string(), fs::read(&p).unwrap()))
        .collect();
    files.sort();
    files
}

fn list_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.extend(list_files(&path));
        } else {
            out.push(path);
        }
    }
    out
}

#[test]
fn test_dependency_is_installed_first() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("skill", "base")).unwrap();
    env.add(Capsule::new("skill", "dependent").deps(&["skill:base"])).unwrap();
    let manifest = env.fixture.build_manifest().unwrap();

    let resolution = Resolver::new(&manifest).resolve(&ids(&["skill:dependent"])).unwrap();
    assert_eq!(resolution.order, ids(&["skill:base", "skill:dependent"]));

    let target = Target::default_target();
    let result = Installer::new(&manifest, &target, env.project())
        .install(&ids(&["skill:dependent"]), InstallOptions::default())
        .unwrap();
    assert_eq!(result.installed, ids(&["skill:base", "skill:dependent"]));
}

#[test]
fn test_diamond_installs_shared_dependency_once() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("doc", "a")).unwrap();
    env.add(Capsule::new("doc", "b").deps(&["doc:a"])).unwrap();
    env.add(Capsule::new("doc", "c").deps(&["doc:a"])).unwrap();
    env.add(Capsule::new("doc", "d").deps(&["doc:b", "doc:c"])).unwrap();
    let manifest = env.fixture.build_manifest().unwrap();

    let order = Resolver::new(&manifest).resolve(&ids(&["doc:d"])).unwrap().order;
    assert_eq!(order.iter().filter(|id| id.name() == "a").count(), 1);
    let pos = |name: &str| order.iter().position(|id| id.name() == name).unwrap();
    assert!(pos("a") < pos("b") && pos("a") < pos("c"));
    assert!(pos("b") < pos("d") && pos("c") < pos("d"));
}

#[test]
fn test_cycle_aborts_install() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("skill", "a").deps(&["skill:b"])).unwrap();
    env.add(Capsule::new("skill", "b").deps(&["skill:c"])).unwrap();
    env.add(Capsule::new("skill", "c").deps(&["skill:a"])).unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let target = Target::default_target();

    let err = Installer::new(&manifest, &target, env.project())
        .install(&ids(&["skill:a"]), InstallOptions::default())
        .unwrap_err();

    match err.downcast_ref::<CapmError>() {
        Some(CapmError::CircularDependency {
            cycle,
        }) => {
            for name in ["a", "b", "c"] {
                assert!(cycle.iter().any(|id| id.name() == name), "{cycle:?}");
            }
            assert_eq!(cycle.first(), cycle.last());
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert!(!env.project_file_exists(".capm/installed.json"));
}

#[test]
fn test_unknown_item_suggests_close_match() {
    let env = TestEnv::with_standard_registry().unwrap();
    let manifest = env.fixture.build_manifest().unwrap();

    let err = Resolver::new(&manifest).resolve(&ids(&["skill:code-reviw"])).unwrap_err();
    match err {
        CapmError::ItemNotFound {
            suggestions,
            ..
        } => assert_eq!(suggestions.first().map(String::as_str), Some("skill:code-review")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_dry_run_is_pure_and_predicts_real_run() {
    let env = TestEnv::with_standard_registry().unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let target = Target::default_target();
    let installer = Installer::new(&manifest, &target, env.project());
    let request = ids(&["skill:code-review", "command:ship", "project:my-project"]);

    // Seed some state so the dry run has something to compare against
    installer.install(&ids(&["command:ship"]), InstallOptions::default()).unwrap();
    let before = snapshot(env.project());

    let preview = installer
        .install(
            &request,
            InstallOptions {
                dry_run: true,
                force: false,
            },
        )
        .unwrap();
    assert_eq!(snapshot(env.project()), before);

    let actual = installer.install(&request, InstallOptions::default()).unwrap();
    assert_eq!(
        (&preview.installed, &preview.updated, &preview.merged, &preview.skipped),
        (&actual.installed, &actual.updated, &actual.merged, &actual.skipped)
    );
    assert_eq!(actual.skipped, ids(&["command:ship"]));
}

#[test]
fn test_reinstall_is_idempotent() {
    let env = TestEnv::with_standard_registry().unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let target = Target::default_target();
    let installer = Installer::new(&manifest, &target, env.project());
    let request = ids(&["skill:code-review"]);

    installer.install(&request, InstallOptions::default()).unwrap();
    let hash_before = Tracker::load(env.project())
        .unwrap()
        .get(&request[0])
        .and_then(|t| t.source_hash.clone());

    let second = installer.install(&request, InstallOptions::default()).unwrap();
    assert_eq!(second.changed(), 0);
    assert!(second.skipped.contains(&request[0]));

    let hash_after = Tracker::load(env.project())
        .unwrap()
        .get(&request[0])
        .and_then(|t| t.source_hash.clone());
    assert_eq!(hash_before, hash_after);
}

#[test]
fn test_tracker_records_paths_and_hashes() {
    let env = TestEnv::with_standard_registry().unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let target = Target::default_target();
    Installer::new(&manifest, &target, env.project())
        .install(&ids(&["skill:code-review"]), InstallOptions::default())
        .unwrap();

    let tracker = Tracker::load(env.project()).unwrap();
    let skill = tracker.get(&"skill:code-review".parse().unwrap()).unwrap();
    assert_eq!(
        skill.installed_path.as_deref(),
        Some(std::path::Path::new(".claude/skills/code-review/SKILL.md"))
    );
    assert!(skill.source_hash.as_deref().is_some_and(|h| h.starts_with("sha256:")));
    assert_eq!(tracker.registry_path, env.registry());
}
