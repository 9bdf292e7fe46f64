//! Shared plumbing for CLI commands.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::CapmConfig;
use crate::core::CapmError;
use crate::installer::InstallResult;
use crate::manifest::Manifest;
use crate::target::Target;
use crate::utils::{ProgressBar, spinner_with_message};

/// Flags every command accepts.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub registry: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub target: Option<String>,
    pub quiet: bool,
    pub progress: bool,
}

/// Flags merged with the config file. Flags win.
#[derive(Debug, Clone)]
pub struct CommandContext {
    config: CapmConfig,
    registry: Option<PathBuf>,
    project: PathBuf,
    target_name: String,
    quiet: bool,
    progress: bool,
}

impl CommandContext {
    pub fn new(options: GlobalOptions, config: CapmConfig) -> Result<Self> {
        let registry = match options.registry {
            Some(path) => Some(path),
            None => config.registry_path()?,
        };
        let project = match options.project {
            Some(path) => path,
            None => std::env::current_dir().context("Cannot determine the current directory")?,
        };
        let target_name = options.target.unwrap_or_else(|| config.target_name().to_string());

        debug!(?registry, project = %project.display(), target = %target_name, "Command context");
        Ok(Self {
            config,
            registry,
            project,
            target_name,
            quiet: options.quiet,
            progress: options.progress,
        })
    }

    /// The registry root; an error when neither flag nor config names one.
    pub fn registry(&self) -> Result<&Path> {
        self.registry.as_deref().ok_or_else(|| {
            CapmError::ConfigError {
                message: "No registry given; pass --registry <DIR> or set `registry` in the config file"
                    .to_string(),
            }
            .into()
        })
    }

    #[must_use]
    pub fn project(&self) -> &Path {
        &self.project
    }

    #[must_use]
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// The selected target, looked up among the built-in and declared ones.
    pub fn target(&self) -> Result<Target> {
        let targets = self.config.load_targets()?;
        Ok(targets.get(&self.target_name)?.clone())
    }

    pub fn spinner(&self, message: &str) -> ProgressBar {
        spinner_with_message(message, self.progress)
    }

    /// Load the persisted manifest, building it when none exists yet.
    pub async fn load_manifest(&self) -> Result<Manifest> {
        let registry = self.registry()?.to_path_buf();
        let spinner = self.spinner("Loading manifest...");

        let manifest = run_blocking(move || match Manifest::load(&registry) {
            Ok(manifest) => Ok(manifest),
            Err(e)
                if matches!(
                    e.downcast_ref::<CapmError>(),
                    Some(CapmError::ManifestNotFound { .. })
                ) =>
            {
                debug!(registry = %registry.display(), "No persisted manifest; building");
                let outcome = Manifest::build(&registry)?;
                let errors = outcome.validation.errors().count();
                if errors > 0 {
                    return Err(CapmError::ValidationFailed {
                        errors,
                    }
                    .into());
                }
                Ok(outcome.manifest)
            }
            Err(e) => Err(e),
        })
        .await;

        spinner.finish_and_clear();
        manifest
    }

    /// Print unless `--quiet`.
    pub fn say(&self, line: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", line.as_ref());
        }
    }
}

/// Run blocking core work on tokio's blocking pool.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.context("Background task failed")?
}

/// Render an install result. Returns an error when any item failed.
pub fn report_install(ctx: &CommandContext, result: &InstallResult) -> Result<()> {
    let prefix = if result.dry_run {
        "would ".dimmed().to_string()
    } else {
        String::new()
    };

    for id in &result.installed {
        ctx.say(format!("  {} {prefix}install {id}", "+".green()));
    }
    for id in &result.updated {
        ctx.say(format!("  {} {prefix}update {id}", "~".yellow()));
    }
    for id in &result.merged {
        ctx.say(format!("  {} {prefix}merge {id}", "»".cyan()));
    }
    for id in &result.skipped {
        ctx.say(format!("  {} {id} {}", "=".dimmed(), "(unchanged)".dimmed()));
    }
    for hook in &result.hooks {
        ctx.say(format!(
            "  {} hook {} on {}: {}",
            "!".yellow(),
            hook.id,
            hook.trigger.bold(),
            hook.run
        ));
    }
    if let Some(merge_file) = &result.merge_file {
        ctx.say(format!("  {prefix}wrote merge file {}", merge_file.display()));
    }
    for error in &result.errors {
        eprintln!("  {} {error}", "✗".red());
    }

    let verb = if result.dry_run {
        "Dry run"
    } else {
        "Done"
    };
    ctx.say(format!(
        "{}: {} installed, {} updated, {} merged, {} unchanged",
        verb.green().bold(),
        result.installed.len(),
        result.updated.len(),
        result.merged.len(),
        result.skipped.len()
    ));

    if result.errors.is_empty() {
        Ok(())
    } else {
        Err(CapmError::Other {
            message: format!("{} item(s) failed to install", result.errors.len()),
        }
        .into())
    }
}
