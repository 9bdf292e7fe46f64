//! The aggregate merge document.
//!
//! Merge-type items never get a file of their own. Their content is collected
//! in [`MergeContent`], rendered as one block, and spliced into the project's
//! merge file between sentinel markers by [`update_existing_file`]. Text the
//! user wrote outside the markers is never touched.

use std::collections::BTreeMap;

use crate::constants::{MERGE_BEGIN_MARKER, MERGE_END_MARKER};
use crate::core::{Item, ItemId, ItemType};

#[derive(Debug, Clone, PartialEq, Eq)]
struct MergeEntry {
    id: ItemId,
    order: i64,
    content: String,
}

/// Merge-type content bucketed by type.
#[derive(Debug, Clone, Default)]
pub struct MergeContent {
    buckets: BTreeMap<ItemType, Vec<MergeEntry>>,
}

impl MergeContent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item's rendered content. Adding the same identity again
    /// replaces the earlier entry. Returns `false` for non-merge items.
    pub fn add(&mut self, item: &Item, content: impl Into<String>) -> bool {
        let Some(id) = item.id().filter(|id| id.item_type().is_merge()) else {
            return false;
        };

        let bucket = self.buckets.entry(id.item_type()).or_default();
        bucket.retain(|entry| entry.id != id);
        bucket.push(MergeEntry {
            id,
            order: item.order,
            content: content.into(),
        });
        true
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.buckets.get(&id.item_type()).is_some_and(|b| b.iter().any(|e| &e.id == id))
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        self.buckets.values().any(|bucket| !bucket.is_empty())
    }

    /// Render every bucket in fixed category order (project, philosophy,
    /// rules); inside a category items sort by `order`, then by name.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut sections = Vec::new();

        for item_type in ItemType::MERGE_ORDER {
            let Some(bucket) = self.buckets.get(&item_type).filter(|b| !b.is_empty()) else {
                continue;
            };

            let mut entries: Vec<&MergeEntry> = bucket.iter().collect();
            entries.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.name().cmp(b.id.name())));

            let mut section = format!("# {}", item_type.heading());
            for entry in entries {
                section.push_str("\n\n");
                section.push_str(entry.content.trim());
            }
            sections.push(section);
        }

        sections.join("\n\n")
    }
}

/// Splice `generated` into `existing` between the sentinel markers.
///
/// - No markers: the managed block is appended after the existing text, or
///   becomes the whole file when the existing text is blank.
/// - Both markers: only the text between them is replaced.
/// - Begin marker without an end marker: everything from the begin marker on
///   is replaced.
#[must_use]
pub fn update_existing_file(existing: &str, generated: &str) -> String {
    let managed = format!("{MERGE_BEGIN_MARKER}\n{}\n{MERGE_END_MARKER}", generated.trim());

    let Some(begin) = existing.find(MERGE_BEGIN_MARKER) else {
        if existing.trim().is_empty() {
            return format!("{managed}\n");
        }
        return format!("{}\n\n{managed}\n", existing.trim_end());
    };

    let after_begin = begin + MERGE_BEGIN_MARKER.len();
    match existing[after_begin..].find(MERGE_END_MARKER) {
        Some(offset) => {
            let end = after_begin + offset + MERGE_END_MARKER.len();
            format!("{}{managed}{}", &existing[..begin], &existing[end..])
        }
        None => format!("{}{managed}\n", &existing[..begin]),
    }
}
