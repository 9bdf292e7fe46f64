//! `capm deps`: dependency tree of one item.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::core::{CapmError, ItemId, suggest_similar};
use crate::resolver::DependencyGraph;

/// Print an item's dependency tree, install order and direct dependents.
#[derive(Args, Debug)]
pub struct DepsCommand {
    /// Item identifier, e.g. `skill:code-review`.
    pub id: String,
}

impl DepsCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let id: ItemId = self.id.parse()?;
        let manifest = ctx.load_manifest().await?;
        if !manifest.contains(&id) {
            return Err(CapmError::ItemNotFound {
                suggestions: suggest_similar(&self.id, manifest.ids()),
                id: self.id,
            }
            .into());
        }

        let graph = DependencyGraph::from_manifest(&manifest);
        print!("{}", graph.to_tree_string(&id));

        match graph.resolve_order(std::slice::from_ref(&id)) {
            Ok(order) => {
                let order: Vec<String> = order.iter().map(ToString::to_string).collect();
                println!("\n{} {}", "Install order:".bold(), order.join(", "));
            }
            Err(e) => eprintln!("\n{} {e}", "✗".red()),
        }

        let dependents = graph.dependents(&id);
        if !dependents.is_empty() {
            let names: Vec<String> = dependents.iter().map(ToString::to_string).collect();
            println!("{} {}", "Required by:".bold(), names.join(", "));
        }
        Ok(())
    }
}
