use capm_cli::manifest::Manifest;
use capm_cli::test_utils::Capsule;
use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn test_build_writes_manifest() {
    let env = TestEnv::with_standard_registry().unwrap();

    let output = env.run_capm(&["build"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("5 items indexed"));

    let manifest = Manifest::load(env.registry()).unwrap();
    assert_eq!(manifest.len(), 5);
    assert!(manifest.contains(&"skill:code-review".parse().unwrap()));
}

#[test]
fn test_build_refuses_duplicates() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("skill", "review")).unwrap();
    env.add(Capsule::new("skill", "review").at("other/review.md")).unwrap();

    let output = env.run_capm(&["build"]).unwrap();
    assert!(!output.success);
    assert_eq!(output.stderr.matches("Duplicate").count() + output.stderr.matches("duplicate").count(), 1);
    assert!(!env.registry().join("build/manifest.json").exists());
}

#[test]
fn test_build_refuses_path_like_names() {
    let env = TestEnv::with_standard_registry().unwrap();
    env.add(Capsule::new("doc", "../../escaped").at("doc/escaped.md")).unwrap();

    let output = env.run_capm(&["build"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("path separators"), "{}", output.stderr);
    assert!(!env.registry().join("build/manifest.json").exists());
}

#[test]
fn test_parse_errors_do_not_block_build() {
    let env = TestEnv::with_standard_registry().unwrap();
    env.fixture.write("broken.md", "---\ncapsule:\n\ttype: skill\n---\n").unwrap();

    let output = env.run_capm(&["build"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(predicate::str::contains("broken.md").eval(&output.stderr));
}

#[test]
fn test_validate_reports_without_writing() {
    let env = TestEnv::with_standard_registry().unwrap();
    env.add(Capsule::new("doc", "Bad_Name")).unwrap();

    let output = env.run_capm(&["validate"]).unwrap();
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("Bad_Name"));
    assert!(!env.registry().join("build/manifest.json").exists());

    let strict = env.run_capm(&["validate", "--strict"]).unwrap();
    assert!(!strict.success);
}

#[test]
fn test_validate_reports_cycles() {
    let env = TestEnv::new().unwrap();
    env.add(Capsule::new("skill", "a").deps(&["skill:b"])).unwrap();
    env.add(Capsule::new("skill", "b").deps(&["skill:a"])).unwrap();

    let output = env.run_capm(&["validate"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("Circular dependency"));
}
