//! Registry items.
//!
//! An [`Item`] is built from the `capsule:` block of a markdown file. Fields are
//! kept as written so the validator can report a missing or unknown type and
//! malformed dependency references; typed accessors give the structured view.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{CapmError, ItemId, ItemType};

/// Advisory lifecycle status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Draft,
    Stable,
    Deprecated,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Stable => "stable",
            Self::Deprecated => "deprecated",
        })
    }
}

impl FromStr for ItemStatus {
    type Err = CapmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "stable" => Ok(Self::Stable),
            "deprecated" => Ok(Self::Deprecated),
            _ => Err(CapmError::Other {
                message: format!("unknown status '{s}'"),
            }),
        }
    }
}

/// A single registry entry.
///
/// Serialized form is the manifest entry: the metadata fields plus `source`.
/// The source directory and body are runtime-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Raw type string; see [`Item::item_type`].
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub desc: String,

    /// Free-form category used for grouping in listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cat: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Dependency references in `type:name` form, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    /// Extra files relative to the item's source directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Position inside a merged section; only meaningful for merge types.
    #[serde(default)]
    pub order: i64,

    /// Name of the target this item is written for, if it is target-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Hook event; required for `hook` items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,

    /// Hook command; required for `hook` items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    /// Originating file, relative to the registry root.
    #[serde(default)]
    pub source: PathBuf,

    /// Directory containing the originating file.
    #[serde(skip)]
    pub source_dir: PathBuf,

    /// Body text after the metadata block.
    #[serde(skip)]
    pub content: String,
}

impl Item {
    /// The typed item type, if the raw string names one.
    #[must_use]
    pub fn item_type(&self) -> Option<ItemType> {
        self.kind.parse().ok()
    }

    /// Canonical identity, if both type and name are usable.
    #[must_use]
    pub fn id(&self) -> Option<ItemId> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        self.item_type().map(|t| ItemId::new(t, name))
    }

    /// Dependency references that parse as identifiers, in declaration order.
    ///
    /// Malformed references are reported by validation and skipped here.
    #[must_use]
    pub fn dependency_ids(&self) -> Vec<ItemId> {
        self.deps.iter().filter_map(|d| d.parse().ok()).collect()
    }

    /// Parsed status; `None` when absent, `Some(Err)` when unrecognized.
    #[must_use]
    pub fn parsed_status(&self) -> Option<Result<ItemStatus, CapmError>> {
        self.status.as_deref().map(str::parse)
    }

    /// Display label: the canonical id when valid, otherwise the source path.
    #[must_use]
    pub fn label(&self) -> String {
        self.id().map_or_else(|| self.source.display().to_string(), |id| id.to_string())
    }
}
