//! `capm update`: reinstall tracked items whose content changed.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, report_install, run_blocking};
use crate::installer::{InstallOptions, Installer};

/// Bring every tracked item up to date with the registry.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Show what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Reinstall every tracked item, changed or not.
    #[arg(long)]
    pub force: bool,
}

impl UpdateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let manifest = ctx.load_manifest().await?;
        let target = ctx.target()?;
        let project = ctx.project().to_path_buf();
        let options = InstallOptions {
            dry_run: self.dry_run,
            force: self.force,
        };

        let spinner = ctx.spinner("Updating installed items...");
        let result =
            run_blocking(move || Installer::new(&manifest, &target, &project).update(options)).await;
        spinner.finish_and_clear();
        let result = result?;

        for id in &result.stale {
            ctx.say(format!("  {} {id} {}", "?".yellow(), "(no longer in the registry)".dimmed()));
        }
        report_install(ctx, &result.install)
    }
}
