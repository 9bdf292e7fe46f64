use assert_cmd::Command;
use capm_cli::test_utils::Capsule;
use capm_cli::tracker::Tracker;
use predicates::prelude::*;
use std::fs;

use crate::common::TestEnv;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("capm")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("uninstall"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_install_and_status() {
    let env = TestEnv::with_standard_registry().unwrap();

    let output = env.run_capm(&["install", "skill:code-review"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("install skill:code-review"));
    assert!(output.stdout.contains("merge ruleset:strict"));
    assert!(env.project_file_exists(".claude/skills/code-review/SKILL.md"));
    assert!(env.project_file_exists("CLAUDE.md"));

    fs::write(env.project().join(".claude/skills/code-review/SKILL.md"), "edited by hand").unwrap();
    let status = env.run_capm(&["status"]).unwrap();
    assert!(status.success, "{}", status.stderr);
    assert!(status.stdout.contains("modified"));
    assert!(status.stdout.contains("merged"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let env = TestEnv::with_standard_registry().unwrap();

    let output = env.run_capm(&["install", "skill:code-review", "--dry-run"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("would install skill:code-review"));
    assert!(output.stdout.contains("Dry run"));
    assert_eq!(fs::read_dir(env.project()).unwrap().count(), 0);
}

#[test]
fn test_second_install_reports_unchanged() {
    let env = TestEnv::with_standard_registry().unwrap();
    assert!(env.run_capm(&["install", "command:ship"]).unwrap().success);

    let again = env.run_capm(&["install", "command:ship"]).unwrap();
    assert!(again.success);
    assert!(again.stdout.contains("(unchanged)"));
    assert!(again.stdout.contains("0 installed"));
}

#[test]
fn test_unknown_item_fails_with_suggestion() {
    let env = TestEnv::with_standard_registry().unwrap();

    let output = env.run_capm(&["install", "skill:code-reveiw"]).unwrap();
    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("not found"));
    assert!(output.stderr.contains("skill:code-review"));
}

#[test]
fn test_malformed_identifier_is_rejected() {
    let env = TestEnv::with_standard_registry().unwrap();

    let output = env.run_capm(&["install", "code-review"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("type:name"));
}

#[test]
fn test_uninstall_keeps_merged_items() {
    let env = TestEnv::with_standard_registry().unwrap();
    assert!(env.run_capm(&["install", "skill:code-review"]).unwrap().success);

    let output = env.run_capm(&["uninstall", "skill:code-review", "ruleset:strict"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("removed skill:code-review"));
    assert!(output.stdout.contains("merged"));
    assert!(!env.project_file_exists(".claude/skills/code-review/SKILL.md"));
    assert!(env.read_project("CLAUDE.md").unwrap().contains("# Rules"));

    let tracker = Tracker::load(env.project()).unwrap();
    assert!(tracker.contains(&"ruleset:strict".parse().unwrap()));
}

#[test]
fn test_update_picks_up_registry_changes() {
    let env = TestEnv::with_standard_registry().unwrap();
    assert!(env.run_capm(&["install", "command:ship"]).unwrap().success);

    env.add(Capsule::new("command", "ship").body("# ship\n\nNew release steps.\n")).unwrap();
    assert!(env.run_capm(&["build"]).unwrap().success);

    let output = env.run_capm(&["update"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("update command:ship"));
    assert!(env.read_project(".claude/commands/ship.md").unwrap().contains("New release steps."));
}

#[test]
fn test_list_filters_by_type() {
    let env = TestEnv::with_standard_registry().unwrap();

    let output = env.run_capm(&["list", "--type", "ruleset"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("strict"));
    assert!(!output.stdout.contains("code-review"));

    let bad = env.run_capm(&["list", "--type", "widget"]).unwrap();
    assert!(!bad.success);
}

#[test]
fn test_deps_prints_tree_and_order() {
    let env = TestEnv::with_standard_registry().unwrap();

    let output = env.run_capm(&["deps", "skill:code-review"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.starts_with("skill:code-review\n"));
    assert!(output.stdout.contains("├── philosophy:clean-code"));
    assert!(output.stdout.contains("Install order:"));

    let leaf = env.run_capm(&["deps", "ruleset:strict"]).unwrap();
    assert!(leaf.stdout.contains("Required by: skill:code-review"));
}

#[test]
fn test_registry_from_config_file() {
    let env = TestEnv::with_standard_registry().unwrap();
    env.write_config(&format!(
        "registry = \"{}\"\n",
        env.registry().display().to_string().replace('\\', "/")
    ))
    .unwrap();

    // No --registry flag; the project is the working directory
    let output = env.run_raw(&["list"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("code-review"));
}

#[test]
fn test_missing_registry_is_reported() {
    let env = TestEnv::new().unwrap();

    let output = env.run_raw(&["list"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("No registry given"));
}
