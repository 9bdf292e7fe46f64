//! `capm list`: show registry items.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::core::ItemType;

/// List items in the manifest, grouped by type.
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Only list items of this type (e.g. `skill`, `ruleset`).
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub item_type: Option<String>,

    /// Only list items carrying this tag.
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let wanted = self.item_type.as_deref().map(str::parse::<ItemType>).transpose()?;
        let manifest = ctx.load_manifest().await?;

        let mut shown = 0;
        for item_type in ItemType::ALL {
            if wanted.is_some_and(|w| w != item_type) {
                continue;
            }
            let items: Vec<_> = manifest
                .of_type(item_type)
                .filter(|item| self.tag.as_ref().is_none_or(|tag| item.tags.contains(tag)))
                .collect();
            if items.is_empty() {
                continue;
            }

            println!("{}", item_type.as_str().bold());
            for item in items {
                println!("  {:<28} {}", item.name.cyan(), item.desc.dimmed());
                shown += 1;
            }
        }

        if shown == 0 {
            ctx.say("No items found");
        }
        Ok(())
    }
}
