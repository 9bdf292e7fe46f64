use capm_cli::core::ItemId;
use capm_cli::installer::{InstallOptions, Installer};
use capm_cli::target::Target;
use capm_cli::test_utils::Capsule;
use std::fs;

use crate::common::TestEnv;

fn ids(raw: &[&str]) -> Vec<ItemId> {
    raw.iter().map(|s| s.parse().unwrap()).collect()
}

const BEFORE: &str = "# Project notes\n\nHand-written intro.\n";
const AFTER: &str = "\n## Footer\n\nHand-written outro.\n";

#[test]
fn test_merge_round_trip_preserves_hand_written_text() {
    let env = TestEnv::with_standard_registry().unwrap();
    let target = Target::default_target();
    fs::write(env.project().join("CLAUDE.md"), BEFORE).unwrap();

    let manifest = env.fixture.build_manifest().unwrap();
    Installer::new(&manifest, &target, env.project())
        .install(&ids(&["ruleset:strict"]), InstallOptions::default())
        .unwrap();

    // User appends below the managed block
    let mut text = env.read_project("CLAUDE.md").unwrap();
    text.push_str(AFTER);
    fs::write(env.project().join("CLAUDE.md"), &text).unwrap();

    env.add(Capsule::new("ruleset", "strict").order(20).body("Brand new rules.\n")).unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let result = Installer::new(&manifest, &target, env.project())
        .install(&ids(&["ruleset:strict"]), InstallOptions::default())
        .unwrap();
    assert_eq!(result.merged, ids(&["ruleset:strict"]));

    let text = env.read_project("CLAUDE.md").unwrap();
    let begin = text.find("<!-- capm:begin -->").unwrap();
    let end = text.find("<!-- capm:end -->").unwrap() + "<!-- capm:end -->".len();
    assert!(text[..begin].starts_with(BEFORE.trim_end()));
    assert_eq!(&text[end..], AFTER);
    assert!(text[begin..end].contains("Brand new rules."));
    assert!(!text[begin..end].contains("Body of ruleset:strict."));
}

#[test]
fn test_sections_follow_fixed_category_order() {
    let env = TestEnv::with_standard_registry().unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let target = Target::default_target();

    // Request rules first; the document order must not follow the request
    Installer::new(&manifest, &target, env.project())
        .install(
            &ids(&["ruleset:strict", "philosophy:clean-code", "project:my-project"]),
            InstallOptions::default(),
        )
        .unwrap();

    let text = env.read_project("CLAUDE.md").unwrap();
    let project = text.find("# Project").unwrap();
    let philosophy = text.find("# Philosophy").unwrap();
    let rules = text.find("# Rules").unwrap();
    assert!(project < philosophy && philosophy < rules);
}

#[test]
fn test_later_install_keeps_earlier_sections() {
    let env = TestEnv::with_standard_registry().unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let target = Target::default_target();
    let installer = Installer::new(&manifest, &target, env.project());

    installer.install(&ids(&["project:my-project"]), InstallOptions::default()).unwrap();
    installer.install(&ids(&["ruleset:strict"]), InstallOptions::default()).unwrap();

    let text = env.read_project("CLAUDE.md").unwrap();
    assert!(text.contains("Body of project:my-project."));
    assert!(text.contains("Body of ruleset:strict."));
}

#[test]
fn test_merge_file_untouched_when_nothing_merged() {
    let env = TestEnv::with_standard_registry().unwrap();
    let manifest = env.fixture.build_manifest().unwrap();
    let target = Target::default_target();

    let result = Installer::new(&manifest, &target, env.project())
        .install(&ids(&["command:ship"]), InstallOptions::default())
        .unwrap();

    assert_eq!(result.merge_file, None);
    assert!(!env.project_file_exists("CLAUDE.md"));
}
