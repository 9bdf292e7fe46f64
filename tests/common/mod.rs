//! Common test utilities for CAPM integration tests
//!
//! Wraps the library's [`RegistryFixture`] with helpers for running the
//! `capm` binary against it.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use capm_cli::test_utils::{Capsule, RegistryFixture, init_test_logging};
use std::path::{Path, PathBuf};

/// Captured output of one `capm` invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// A registry, a project, and an isolated (absent) config file.
pub struct TestEnv {
    pub fixture: RegistryFixture,
    config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        init_test_logging(None);
        let fixture = RegistryFixture::new()?;
        let config_path = fixture.registry().with_file_name("config.toml");
        Ok(Self {
            fixture,
            config_path,
        })
    }

    /// A registry with a skill depending on a ruleset and a philosophy, and
    /// an independent command.
    pub fn with_standard_registry() -> Result<Self> {
        let env = Self::new()?;
        env.add(Capsule::new("ruleset", "strict").order(20))?;
        env.add(Capsule::new("philosophy", "clean-code").order(10))?;
        env.add(Capsule::new("project", "my-project").order(5))?;
        env.add(
            Capsule::new("skill", "code-review")
                .desc("Review code changes for correctness")
                .deps(&["ruleset:strict", "philosophy:clean-code"]),
        )?;
        env.add(Capsule::new("command", "ship"))?;
        Ok(env)
    }

    pub fn add(&self, capsule: Capsule) -> Result<PathBuf> {
        self.fixture.add(capsule)
    }

    pub fn registry(&self) -> &Path {
        self.fixture.registry()
    }

    pub fn project(&self) -> &Path {
        self.fixture.project()
    }

    /// Write `~/.capm/config.toml` equivalent for this environment.
    pub fn write_config(&self, content: &str) -> Result<()> {
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Run `capm` with `--registry` and `--project` pointing at the fixture.
    pub fn run_capm(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut full = vec![
            "--registry".to_string(),
            self.registry().display().to_string(),
            "--project".to_string(),
            self.project().display().to_string(),
        ];
        full.extend(args.iter().map(ToString::to_string));
        self.run_raw(&full)
    }

    /// Run `capm` with exactly `args`.
    pub fn run_raw<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> Result<CommandOutput> {
        let output = Command::cargo_bin("capm")?
            .args(args)
            .env("CAPM_CONFIG", &self.config_path)
            .env("CAPM_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .current_dir(self.project())
            .output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    pub fn read_project(&self, relative: &str) -> Result<String> {
        self.fixture.read_project(relative)
    }

    pub fn project_file_exists(&self, relative: &str) -> bool {
        self.project().join(relative).exists()
    }
}
