//! `capm install`: install items and their dependencies.

use anyhow::Result;
use clap::Args;

use super::common::{CommandContext, report_install, run_blocking};
use crate::installer::{InstallOptions, Installer};
use crate::resolver::parse_ids;

/// Install items, dependencies first, into the project.
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Items to install, as `type:name`.
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    /// Show what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Reinstall items even when their content is unchanged.
    #[arg(long)]
    pub force: bool,
}

impl InstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let ids = parse_ids(&self.ids)?;
        let manifest = ctx.load_manifest().await?;
        let target = ctx.target()?;
        let project = ctx.project().to_path_buf();
        let options = InstallOptions {
            dry_run: self.dry_run,
            force: self.force,
        };

        let spinner = ctx.spinner(&format!("Installing into {}...", project.display()));
        let result = run_blocking(move || {
            Installer::new(&manifest, &target, &project).install(&ids, options)
        })
        .await;
        spinner.finish_and_clear();

        report_install(ctx, &result?)
    }
}
