//! `capm uninstall`: remove installed items.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, run_blocking};
use crate::core::CapmError;
use crate::installer::Installer;
use crate::resolver::parse_ids;

/// Remove items from the project and forget them.
///
/// Merged items keep their section in the merge file and stay tracked.
#[derive(Args, Debug)]
pub struct UninstallCommand {
    /// Items to remove, as `type:name`.
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    /// Show what would be removed without touching anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl UninstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let ids = parse_ids(&self.ids)?;
        let manifest = ctx.load_manifest().await?;
        let target = ctx.target()?;
        let project = ctx.project().to_path_buf();
        let dry_run = self.dry_run;

        let result = run_blocking(move || {
            Installer::new(&manifest, &target, &project).uninstall(&ids, dry_run)
        })
        .await?;

        let verb = if dry_run {
            "would remove"
        } else {
            "removed"
        };
        for id in &result.uninstalled {
            ctx.say(format!("  {} {verb} {id}", "-".red()));
        }
        for id in &result.skipped {
            ctx.say(format!("  {} {id} {}", "=".dimmed(), "(merged; edit the merge file by hand)".dimmed()));
        }
        for id in &result.not_found {
            ctx.say(format!("  {} {id} {}", "?".yellow(), "(not installed)".dimmed()));
        }
        for error in &result.errors {
            eprintln!("  {} {error}", "✗".red());
        }

        if result.errors.is_empty() {
            Ok(())
        } else {
            Err(CapmError::Other {
                message: format!("{} item(s) failed to uninstall", result.errors.len()),
            }
            .into())
        }
    }
}
