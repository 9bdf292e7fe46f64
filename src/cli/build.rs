//! `capm build`: scan, validate and persist the manifest.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, run_blocking};
use crate::core::CapmError;
use crate::manifest::Manifest;
use crate::validation::Severity;

/// Scan the registry and write `build/manifest.json`.
///
/// The manifest is written only when validation reports no errors. Files
/// whose metadata block cannot be parsed are reported but do not block the
/// build.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Also list warnings and info-level issues.
    #[arg(long)]
    pub warnings: bool,
}

impl BuildCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let registry = ctx.registry()?.to_path_buf();
        let spinner = ctx.spinner("Scanning registry...");
        let outcome = run_blocking(move || Manifest::build(&registry)).await;
        spinner.finish_and_clear();
        let outcome = outcome?;

        for error in &outcome.scan_errors {
            eprintln!("{} {error}", "parse error:".red());
        }
        for issue in outcome.validation.errors() {
            eprintln!("{} {issue}", "✗".red());
        }
        if self.warnings {
            for issue in outcome.validation.issues.iter().filter(|i| i.severity != Severity::Error) {
                ctx.say(format!("{} {issue}", "!".yellow()));
            }
        }

        let Some(path) = outcome.persisted else {
            return Err(CapmError::ValidationFailed {
                errors: outcome.validation.errors().count(),
            }
            .into());
        };

        ctx.say(format!(
            "{} {} items indexed into {}",
            "Built".green().bold(),
            outcome.manifest.len(),
            path.display()
        ));
        for (item_type, count) in outcome.manifest.stats() {
            ctx.say(format!("  {:<12} {count}", item_type.as_str()));
        }
        let warnings = outcome.validation.warnings().count();
        if warnings > 0 && !self.warnings {
            ctx.say(format!("  {warnings} warning(s); run 'capm validate' for details").dimmed().to_string());
        }
        if !outcome.skipped.is_empty() {
            ctx.say(format!("  {} markdown file(s) without capsule metadata", outcome.skipped.len()));
        }
        Ok(())
    }
}
