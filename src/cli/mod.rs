//! Command-line interface for CAPM (Capsule Package Manager).
//!
//! The CLI is a thin layer over the library: it resolves the registry,
//! project and target from flags and the config file, runs the blocking core
//! on tokio's blocking pool, and renders the structured results. All output
//! formatting lives here.
//!
//! # Commands
//!
//! ## Registry
//! - `build` - Scan and validate the registry, write `build/manifest.json`
//! - `validate` - Report scan errors, validation issues and cycles
//! - `list` - List registry items, optionally of one type
//! - `deps` - Show an item's dependency tree and its direct dependents
//!
//! ## Project
//! - `install` - Install items and their dependencies
//! - `uninstall` - Remove installed items
//! - `update` - Reinstall every tracked item whose content changed
//! - `status` - Compare installed files with what was installed
//!
//! # Example
//!
//! ```bash
//! capm --registry ~/capsules build
//! capm --registry ~/capsules install skill:code-review --dry-run
//! capm --registry ~/capsules --project ./app install skill:code-review
//! capm status
//! ```

mod build;
pub mod common;
mod deps;
mod install;
mod list;
mod status;
mod uninstall;
mod update;
mod validate;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::{CommandContext, GlobalOptions};

use crate::config::CapmConfig;

/// Main CLI application structure for CAPM.
#[derive(Parser, Debug)]
#[command(
    name = "capm",
    about = "Capsule Package Manager - install markdown capsules into coding-assistant projects",
    version,
    long_about = "CAPM indexes a registry of markdown capsules (skills, agents, rulesets, ...) and \
                  installs them, with their dependencies, into a project laid out for a target tool."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Registry root (defaults to `registry` in the config file).
    #[arg(long, global = true, value_name = "DIR")]
    registry: Option<PathBuf>,

    /// Destination project (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Target layout (defaults to `target` in the config file, then `claude`).
    #[arg(long, global = true, value_name = "NAME")]
    target: Option<String>,

    /// Disable spinners.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the registry and write the manifest.
    Build(build::BuildCommand),

    /// Check the registry without writing anything.
    Validate(validate::ValidateCommand),

    /// List registry items.
    List(list::ListCommand),

    /// Install items and their dependencies into the project.
    Install(install::InstallCommand),

    /// Remove installed items from the project.
    Uninstall(uninstall::UninstallCommand),

    /// Reinstall tracked items whose content changed.
    Update(update::UpdateCommand),

    /// Show installed items and whether they were modified.
    Status(status::StatusCommand),

    /// Show an item's dependency tree.
    Deps(deps::DepsCommand),
}

impl Cli {
    /// Load the config file and run the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = CapmConfig::load().await?;
        self.execute_with_config(config).await
    }

    /// Run with an explicit config; used by tests.
    pub async fn execute_with_config(self, config: CapmConfig) -> Result<()> {
        let ctx = CommandContext::new(self.global_options(), config)?;

        match self.command {
            Commands::Build(cmd) => cmd.execute(&ctx).await,
            Commands::Validate(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx).await,
            Commands::Install(cmd) => cmd.execute(&ctx).await,
            Commands::Uninstall(cmd) => cmd.execute(&ctx).await,
            Commands::Update(cmd) => cmd.execute(&ctx).await,
            Commands::Status(cmd) => cmd.execute(&ctx).await,
            Commands::Deps(cmd) => cmd.execute(&ctx).await,
        }
    }

    /// Flags shared by every command.
    #[must_use]
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            registry: self.registry.clone(),
            project: self.project.clone(),
            target: self.target.clone(),
            quiet: self.quiet,
            progress: !self.no_progress && !self.quiet,
        }
    }

    /// Log filter for this invocation: `-v` forces debug, otherwise
    /// `RUST_LOG` applies, falling back to warnings only.
    #[must_use]
    pub fn log_filter(&self) -> EnvFilter {
        if self.verbose {
            EnvFilter::new("capm_cli=debug")
        } else if self.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    }

    /// Install the stderr log subscriber.
    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}
