//! `capm validate`: check the registry without writing the manifest.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, run_blocking};
use crate::core::CapmError;
use crate::manifest::Manifest;
use crate::resolver::DependencyGraph;
use crate::scanner::{ScanError, Scanner};
use crate::validation::{Severity, ValidationResult, validate_items};

/// Report parse errors, validation issues and dependency cycles.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

struct Report {
    scan_errors: Vec<ScanError>,
    validation: ValidationResult,
    cycle: Option<CapmError>,
    items: usize,
}

impl ValidateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let registry = ctx.registry()?.to_path_buf();
        let spinner = ctx.spinner("Validating registry...");
        let report = run_blocking(move || {
            let scan = Scanner::new(&registry).scan()?;
            let validation = validate_items(&scan.items);
            let items = scan.items.len();
            let manifest = Manifest::from_items(&registry, scan.items);
            let cycle = DependencyGraph::from_manifest(&manifest).topological_sort().err();
            Ok(Report {
                scan_errors: scan.errors,
                validation,
                cycle,
                items,
            })
        })
        .await;
        spinner.finish_and_clear();
        let report = report?;

        for error in &report.scan_errors {
            eprintln!("{} {error}", "parse error:".red());
        }
        for issue in &report.validation.issues {
            let marker = match issue.severity {
                Severity::Error => "✗".red(),
                Severity::Warning => "!".yellow(),
                Severity::Info => "i".blue(),
            };
            ctx.say(format!("{marker} {issue}"));
        }
        if let Some(cycle) = &report.cycle {
            eprintln!("{} {cycle}", "✗".red());
        }

        let errors = report.scan_errors.len()
            + report.validation.count(Severity::Error)
            + usize::from(report.cycle.is_some());
        let warnings = report.validation.count(Severity::Warning);
        let failing = if self.strict {
            errors + warnings
        } else {
            errors
        };

        if failing > 0 {
            return Err(CapmError::ValidationFailed {
                errors: failing,
            }
            .into());
        }

        ctx.say(format!(
            "{} {} items, {} warning(s)",
            "Valid:".green().bold(),
            report.items,
            warnings
        ));
        Ok(())
    }
}
