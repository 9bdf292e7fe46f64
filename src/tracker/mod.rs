//! Per-project record of installed items.
//!
//! Stored at `.capm/installed.json` inside the destination project:
//!
//! ```json
//! {
//!   "version": 1,
//!   "target": "claude",
//!   "last_updated": "2025-01-01T00:00:00Z",
//!   "registry_path": "/path/to/registry",
//!   "items": {
//!     "skill:code-review": {
//!       "id": "skill:code-review",
//!       "type": "skill",
//!       "name": "code-review",
//!       "installed_at": "2025-01-01T00:00:00Z",
//!       "updated_at": "2025-01-01T00:00:00Z",
//!       "version": "0.1.0",
//!       "source_hash": "sha256:…",
//!       "installed_path": ".claude/skills/code-review/SKILL.md"
//!     }
//!   }
//! }
//! ```
//!
//! A missing file is an empty tracker. An unreadable or malformed one is a
//! hard error: installing on top of state we cannot read would corrupt it.

pub mod checksum;

pub use checksum::{content_hash, file_hash};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{STATE_DIR, TRACKER_FILE, TRACKER_VERSION};
use crate::core::{CapmError, ItemId, ItemType};
use crate::utils::fs::atomic_write;

/// One installed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub name: String,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tool version that wrote the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Hash of the transformed content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    /// Destination relative to the project root; the merge file for merged
    /// items, absent for meta items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_path: Option<PathBuf>,
    /// Extra files copied next to `installed_path`, relative to the project
    /// root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merged: bool,
}

/// What to record for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub source_hash: String,
    pub installed_path: Option<PathBuf>,
    pub extra_files: Vec<PathBuf>,
    pub merged: bool,
}

/// Installed state of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub version: u32,
    #[serde(default)]
    pub target: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub registry_path: PathBuf,
    #[serde(default)]
    pub items: BTreeMap<ItemId, TrackedItem>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            version: TRACKER_VERSION,
            target: String::new(),
            last_updated: Utc::now(),
            registry_path: PathBuf::new(),
            items: BTreeMap::new(),
        }
    }
}

impl Tracker {
    /// Tracker file location for a project.
    #[must_use]
    pub fn path_for(project_dir: &Path) -> PathBuf {
        project_dir.join(STATE_DIR).join(TRACKER_FILE)
    }

    /// Load a project's tracker, or an empty one when none exists yet.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::path_for(project_dir);
        if !path.exists() {
            debug!(path = %path.display(), "No tracker file; starting empty");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read tracker file: {}", path.display()))?;
        let tracker: Self = serde_json::from_str(&content)
            .map_err(|e| CapmError::TrackerParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
            .with_context(|| {
                format!(
                    "Tracker {} is corrupted; fix it by hand or delete it and reinstall",
                    path.display()
                )
            })?;

        if tracker.version > TRACKER_VERSION {
            return Err(CapmError::UnsupportedSchemaVersion {
                file: path.display().to_string(),
                found: tracker.version,
                supported: TRACKER_VERSION,
            }
            .into());
        }

        debug!(path = %path.display(), items = tracker.items.len(), "Loaded tracker");
        Ok(tracker)
    }

    /// Write the tracker atomically, stamping `last_updated`.
    pub fn save(&mut self, project_dir: &Path) -> Result<PathBuf> {
        let path = Self::path_for(project_dir);
        self.version = TRACKER_VERSION;
        self.last_updated = Utc::now();

        let json = serde_json::to_string_pretty(self).context("Failed to serialize tracker")?;
        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Cannot write tracker file: {}", path.display()))?;
        debug!(path = %path.display(), items = self.items.len(), "Saved tracker");
        Ok(path)
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&TrackedItem> {
        self.items.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Whether `id` is tracked with exactly `hash`.
    #[must_use]
    pub fn has_hash(&self, id: &ItemId, hash: &str) -> bool {
        self.items.get(id).and_then(|t| t.source_hash.as_deref()) == Some(hash)
    }

    /// Create or update the entry for `id`. Returns `true` when the entry
    /// already existed.
    pub fn record(&mut self, id: &ItemId, installation: Installation) -> bool {
        let now = Utc::now();
        let version = Some(env!("CARGO_PKG_VERSION").to_string());

        if let Some(entry) = self.items.get_mut(id) {
            entry.updated_at = now;
            entry.version = version;
            entry.source_hash = Some(installation.source_hash);
            entry.installed_path = installation.installed_path;
            entry.extra_files = installation.extra_files;
            entry.merged = installation.merged;
            return true;
        }

        self.items.insert(
            id.clone(),
            TrackedItem {
                id: id.clone(),
                item_type: id.item_type(),
                name: id.name().to_string(),
                installed_at: now,
                updated_at: now,
                version,
                source_hash: Some(installation.source_hash),
                installed_path: installation.installed_path,
                extra_files: installation.extra_files,
                merged: installation.merged,
            },
        );
        false
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<TrackedItem> {
        self.items.remove(id)
    }

    /// Tracked identifiers that were merged into the merge document.
    pub fn merged_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.values().filter(|t| t.merged).map(|t| &t.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
