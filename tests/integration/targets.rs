use capm_cli::core::{CapmError, ItemType};
use capm_cli::installer::{InstallOptions, Installer};
use capm_cli::target::Targets;
use capm_cli::test_utils::Capsule;
use std::fs;

use crate::common::TestEnv;

const CURSOR: &str = r#"
name: cursor
description: Cursor rules layout
version: "1"
base_dir: .cursor
merge_file: .cursorrules
paths:
  skill:
    dir: rules
    pattern: "{name}.mdc"
transforms:
  skill:
    wrap_with: "<rule name=\"{{ name }}\">\n{{ content }}\n</rule>"
"#;

#[test]
fn test_declared_target_controls_paths_and_transforms() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("skill", "review")).unwrap();
    env.add(Capsule::new("ruleset", "strict")).unwrap();
    let targets_dir = env.registry().with_file_name("targets");
    fs::create_dir_all(&targets_dir).unwrap();
    fs::write(targets_dir.join("cursor.yaml"), CURSOR).unwrap();

    let targets = Targets::load_dir(&targets_dir).unwrap();
    assert_eq!(targets.names(), vec!["claude".to_string(), "cursor".to_string()]);
    let target = targets.get("cursor").unwrap();

    let manifest = env.fixture.build_manifest().unwrap();
    let result = Installer::new(&manifest, target, env.project())
        .install(&["skill:review".parse().unwrap(), "ruleset:strict".parse().unwrap()], InstallOptions::default())
        .unwrap();
    assert!(result.is_success(), "{:?}", result.errors);

    let skill = env.read_project(".cursor/rules/review.mdc").unwrap();
    assert!(skill.starts_with("<rule name=\"review\">"));
    assert!(skill.ends_with("</rule>"));
    assert!(env.read_project(".cursorrules").unwrap().contains("# Rules"));
}

#[test]
fn test_type_without_path_rule_fails_only_that_item() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("command", "ship")).unwrap();
    env.add(Capsule::new("skill", "review")).unwrap();
    let targets_dir = env.registry().with_file_name("targets");
    fs::create_dir_all(&targets_dir).unwrap();
    fs::write(targets_dir.join("cursor.yaml"), CURSOR).unwrap();
    let targets = Targets::load_dir(&targets_dir).unwrap();

    let manifest = env.fixture.build_manifest().unwrap();
    let result = Installer::new(&manifest, targets.get("cursor").unwrap(), env.project())
        .install(&["command:ship".parse().unwrap(), "skill:review".parse().unwrap()], InstallOptions::default())
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].id.item_type(), ItemType::Command);
    assert_eq!(result.installed.len(), 1);
}

#[test]
fn test_unknown_target_lists_available() {
    let err = Targets::builtin().get("vim").unwrap_err();
    match err {
        CapmError::UnknownTarget {
            available,
            ..
        } => assert_eq!(available, vec!["claude".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_cli_uses_targets_dir_from_config() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("skill", "review")).unwrap();
    let targets_dir = env.registry().with_file_name("targets");
    fs::create_dir_all(&targets_dir).unwrap();
    fs::write(targets_dir.join("cursor.yaml"), CURSOR).unwrap();
    env.write_config(&format!(
        "targets_dir = \"{}\"\ntarget = \"cursor\"\n",
        targets_dir.display().to_string().replace('\\', "/")
    ))
    .unwrap();

    let output = env.run_capm(&["install", "skill:review"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(env.project_file_exists(".cursor/rules/review.mdc"));
}
