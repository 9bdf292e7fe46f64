//! The registry manifest.
//!
//! A [`Manifest`] maps every [`ItemId`] to its [`Item`]. It is rebuilt wholesale
//! by [`Manifest::build`] (scan, validate, persist) and is read-only afterwards;
//! the resolver and installer only ever borrow it.
//!
//! # Persisted form
//!
//! `build/manifest.json` under the registry root:
//!
//! ```json
//! {
//!   "version": 1,
//!   "generated": "2025-01-01T00:00:00Z",
//!   "registry_path": "/path/to/registry",
//!   "items": { "skill:code-review": { "type": "skill", "name": "code-review", "source": "skills/code-review.md" } },
//!   "stats": { "skill": 1 }
//! }
//! ```
//!
//! Item bodies are not persisted; the installer re-reads each source file.
//! The snapshot is only written when validation reports no errors.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{BUILD_DIR, MANIFEST_FILE, MANIFEST_VERSION};
use crate::core::{CapmError, Item, ItemId, ItemType};
use crate::scanner::{ScanError, Scanner};
use crate::utils::fs::atomic_write;
use crate::validation::{ValidationResult, validate_items};

/// Indexed view of a registry.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    registry_path: PathBuf,
    items: BTreeMap<ItemId, Item>,
}

/// Everything a build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub manifest: Manifest,
    pub scan_errors: Vec<ScanError>,
    /// Markdown files without capsule metadata.
    pub skipped: Vec<PathBuf>,
    pub validation: ValidationResult,
    /// Where the snapshot was written; `None` when validation failed.
    pub persisted: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    generated: DateTime<Utc>,
    registry_path: PathBuf,
    items: BTreeMap<ItemId, Item>,
    #[serde(default)]
    stats: BTreeMap<String, usize>,
}

impl Manifest {
    pub fn new(registry_path: impl Into<PathBuf>) -> Self {
        Self {
            registry_path: registry_path.into(),
            items: BTreeMap::new(),
        }
    }

    /// Index `items` by identity.
    ///
    /// Items without a usable identity are left out, and the first of any
    /// duplicates wins; validation reports both cases.
    pub fn from_items(registry_path: impl Into<PathBuf>, items: impl IntoIterator<Item = Item>) -> Self {
        let mut manifest = Self::new(registry_path);
        for item in items {
            let Some(id) = item.id() else {
                continue;
            };
            manifest.items.entry(id).or_insert(item);
        }
        manifest
    }

    /// Location of the persisted snapshot for a registry root.
    #[must_use]
    pub fn path_for(registry_root: &Path) -> PathBuf {
        registry_root.join(BUILD_DIR).join(MANIFEST_FILE)
    }

    /// Scan and validate `registry_root`, persisting the manifest when
    /// validation reports no errors.
    ///
    /// Scan errors are reported but do not block persistence: the files they
    /// come from simply contribute no items.
    pub fn build(registry_root: &Path) -> Result<BuildOutcome> {
        let scan = Scanner::new(registry_root).scan()?;
        let validation = validate_items(&scan.items);
        let manifest = Self::from_items(registry_root, scan.items);

        let persisted = if validation.has_errors() {
            warn!(
                errors = validation.errors().count(),
                "Validation failed; manifest not persisted"
            );
            None
        } else {
            Some(manifest.save()?)
        };

        Ok(BuildOutcome {
            manifest,
            scan_errors: scan.errors,
            skipped: scan.skipped,
            validation,
            persisted,
        })
    }

    /// Write the snapshot to `build/manifest.json` under the registry root.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path_for(&self.registry_path);
        let snapshot = ManifestFile {
            version: MANIFEST_VERSION,
            generated: Utc::now(),
            registry_path: self.registry_path.clone(),
            items: self.items.clone(),
            stats: self.stats().into_iter().map(|(t, n)| (t.to_string(), n)).collect(),
        };

        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize manifest")?;
        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Cannot write manifest: {}", path.display()))?;

        debug!(path = %path.display(), items = self.items.len(), "Saved manifest");
        Ok(path)
    }

    /// Load the snapshot persisted under `registry_root`.
    ///
    /// Each item's source directory is re-derived from `registry_root`, so a
    /// registry that moved after its build still resolves extra files.
    pub fn load(registry_root: &Path) -> Result<Self> {
        let path = Self::path_for(registry_root);
        if !path.exists() {
            return Err(CapmError::ManifestNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read manifest: {}", path.display()))?;
        let snapshot: ManifestFile = serde_json::from_str(&content)
            .map_err(|e| CapmError::ManifestParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
            .with_context(|| {
                format!(
                    "Manifest {} is corrupted; run 'capm build' to regenerate it",
                    path.display()
                )
            })?;

        if snapshot.version > MANIFEST_VERSION {
            return Err(CapmError::UnsupportedSchemaVersion {
                file: path.display().to_string(),
                found: snapshot.version,
                supported: MANIFEST_VERSION,
            }
            .into());
        }

        let mut items = snapshot.items;
        for item in items.values_mut() {
            let source = registry_root.join(&item.source);
            item.source_dir =
                source.parent().map_or_else(|| registry_root.to_path_buf(), Path::to_path_buf);
        }

        debug!(path = %path.display(), items = items.len(), "Loaded manifest");
        Ok(Self {
            registry_path: registry_root.to_path_buf(),
            items,
        })
    }

    #[must_use]
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.keys()
    }

    /// `(id, item)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &Item)> {
        self.items.iter()
    }

    /// Items of one type, in sorted order.
    pub fn of_type(&self, item_type: ItemType) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |(id, _)| id.item_type() == item_type).map(|(_, item)| item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item count per type; types with no items are omitted.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<ItemType, usize> {
        let mut stats = BTreeMap::new();
        for id in self.items.keys() {
            *stats.entry(id.item_type()).or_insert(0) += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(kind: &str, name: &str, source: &str) -> Item {
        Item {
            kind: kind.into(),
            name: name.into(),
            desc: "A description with words".into(),
            tags: ["t".to_string()].into(),
            order: 1,
            source: source.into(),
            ..Item::default()
        }
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn capsule(kind: &str, name: &str, extra: &str) -> String {
        format!(
            "---\ncapsule:\n  type: {kind}\n  name: {name}\n  desc: Some useful words here\n  tags: [x]\n{extra}---\nBody of {name}\n"
        )
    }

    #[test]
    fn test_from_items_first_duplicate_wins() {
        let manifest = Manifest::from_items(
            "/registry",
            vec![
                item("skill", "dup", "a.md"),
                item("skill", "dup", "b.md"),
                item("widget", "bad", "c.md"),
                item("doc", "guide", "d.md"),
            ],
        );
        assert_eq!(manifest.len(), 2);
        let dup = manifest.get(&"skill:dup".parse().unwrap()).unwrap();
        assert_eq!(dup.source, PathBuf::from("a.md"));
    }

    #[test]
    fn test_stats_and_of_type() {
        let manifest = Manifest::from_items(
            "/registry",
            vec![item("skill", "a", "a.md"), item("skill", "b", "b.md"), item("doc", "c", "c.md")],
        );
        let stats = manifest.stats();
        assert_eq!(stats.get(&ItemType::Skill), Some(&2));
        assert_eq!(stats.get(&ItemType::Doc), Some(&1));
        assert!(!stats.contains_key(&ItemType::Hook));
        assert_eq!(manifest.of_type(ItemType::Skill).count(), 2);
    }

    #[test]
    fn test_build_persists_and_load_restores() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "skills/review/review.md", &capsule("skill", "review", ""));
        write(root, "docs/guide.md", &capsule("doc", "guide", ""));

        let outcome = Manifest::build(root).unwrap();
        assert!(!outcome.validation.has_errors());
        let persisted = outcome.persisted.unwrap();
        assert_eq!(persisted, root.join("build/manifest.json"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&persisted).unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["stats"]["skill"], 1);
        assert!(json["items"]["skill:review"]["content"].is_null());

        let loaded = Manifest::load(root).unwrap();
        assert_eq!(loaded.len(), 2);
        let review = loaded.get(&"skill:review".parse().unwrap()).unwrap();
        assert_eq!(review.source, PathBuf::from("skills/review/review.md"));
        assert_eq!(review.source_dir, root.join("skills/review"));
    }

    #[test]
    fn test_build_with_errors_is_not_persisted() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "a.md", &capsule("skill", "a", "  deps: [skill:ghost]\n"));

        let outcome = Manifest::build(root).unwrap();
        assert!(outcome.validation.has_errors());
        assert!(outcome.persisted.is_none());
        assert!(!Manifest::path_for(root).exists());
        assert_eq!(outcome.manifest.len(), 1);
    }

    #[test]
    fn test_scan_errors_do_not_block_persistence() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "good.md", &capsule("doc", "good", ""));
        write(root, "bad.md", "---\ncapsule:\n  type: doc\n  name broken\n---\n");

        let outcome = Manifest::build(root).unwrap();
        assert_eq!(outcome.scan_errors.len(), 1);
        assert!(outcome.persisted.is_some());
    }

    #[test]
    fn test_load_missing_and_newer_version() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let err = Manifest::load(root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CapmError>(),
            Some(CapmError::ManifestNotFound { .. })
        ));

        write(
            root,
            "build/manifest.json",
            r#"{"version": 99, "generated": "2025-01-01T00:00:00Z", "registry_path": "/x", "items": {}}"#,
        );
        let err = Manifest::load(root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CapmError>(),
            Some(CapmError::UnsupportedSchemaVersion { found: 99, .. })
        ));

        write(root, "build/manifest.json", "{ not json");
        let err = Manifest::load(root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CapmError>(),
            Some(CapmError::ManifestParseError { .. })
        ));
    }
}
