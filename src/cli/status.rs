//! `capm status`: installed items and drift.

use anyhow::Result;
use clap::Args;
use colored::{ColoredString, Colorize};

use super::common::{CommandContext, run_blocking};
use crate::installer::{DriftState, Installer};

/// Show every tracked item and whether its file still matches.
#[derive(Args, Debug)]
pub struct StatusCommand {}

fn paint(state: DriftState) -> ColoredString {
    let label = format!("{state:<9}", state = state.to_string());
    match state {
        DriftState::Clean => label.green(),
        DriftState::Modified => label.yellow(),
        DriftState::Missing => label.red(),
        DriftState::Merged | DriftState::Meta => label.dimmed(),
    }
}

impl StatusCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let manifest = ctx.load_manifest().await?;
        let target = ctx.target()?;
        let project = ctx.project().to_path_buf();

        let entries =
            run_blocking(move || Installer::new(&manifest, &target, &project).status()).await?;

        if entries.is_empty() {
            ctx.say("Nothing installed");
            return Ok(());
        }

        for entry in &entries {
            let path = entry
                .installed_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let stale = if entry.in_manifest {
                String::new()
            } else {
                " (not in registry)".yellow().to_string()
            };
            println!("  {} {:<32} {}{stale}", paint(entry.state), entry.id.to_string(), path.dimmed());
        }
        Ok(())
    }
}
