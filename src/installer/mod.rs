//! Installation into a destination project.
//!
//! The [`Installer`] ties the pipeline together for one project:
//!
//! 1. resolve the request against the manifest (dependencies first),
//! 2. transform each item for the target,
//! 3. write install types to their target path, collect merge types into the
//!    merge document, record meta types,
//! 4. splice the merge document into the project's merge file,
//! 5. save the tracker once.
//!
//! # Idempotence
//!
//! Each item's transformed content is hashed. An item whose hash matches the
//! tracked one is skipped unless `force` is set, so re-running an install is
//! cheap and changes nothing.
//!
//! # Dry runs
//!
//! A dry run goes through exactly the same decisions and reports the same
//! classification as a real run, but writes nothing: no files, no merge
//! document, no tracker, and no lock.
//!
//! # Failures
//!
//! Resolution failures (unknown item, cycle, missing dependency) and tracker
//! I/O abort the call. Failures of a single item (unreadable source, template
//! error, write error) are collected in the result and the remaining items
//! are still processed.

pub mod merge;
mod project_lock;


pub use merge::{MergeContent, update_existing_file};
pub use project_lock::ProjectLock;

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::core::{CapmError, Item, ItemCategory, ItemId, ItemType};
use crate::manifest::Manifest;
use crate::resolver::Resolver;
use crate::target::{Target, Transformer};
use crate::tracker::{Installation, Tracker, content_hash, file_hash};
use crate::utils::fs::{atomic_write, ensure_parent_dir, is_safe_path, remove_dir_if_empty};

/// Flags for install and update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Report what would happen without writing anything.
    pub dry_run: bool,
    /// Reinstall even when the content hash is unchanged.
    pub force: bool,
}

/// A failure confined to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallError {
    pub id: ItemId,
    pub message: String,
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

/// A hook's directive, recorded but never executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDirective {
    pub id: ItemId,
    pub trigger: String,
    pub run: String,
}

/// Outcome of an install call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallResult {
    /// Written for the first time.
    pub installed: Vec<ItemId>,
    /// Rewritten over a previously tracked version.
    pub updated: Vec<ItemId>,
    /// Unchanged, or meta items with nothing to write.
    pub skipped: Vec<ItemId>,
    /// Merged into the merge document.
    pub merged: Vec<ItemId>,
    pub hooks: Vec<HookDirective>,
    /// Merge file relative to the project, when it was (or would be) written.
    pub merge_file: Option<PathBuf>,
    pub errors: Vec<InstallError>,
    pub dry_run: bool,
}

impl InstallResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of items that changed the project.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.installed.len() + self.updated.len() + self.merged.len()
    }
}

/// Outcome of an uninstall call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallResult {
    pub uninstalled: Vec<ItemId>,
    /// Merged items; their section stays in the merge document.
    pub skipped: Vec<ItemId>,
    pub not_found: Vec<ItemId>,
    pub errors: Vec<InstallError>,
    pub dry_run: bool,
}

/// Outcome of an update call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub install: InstallResult,
    /// Tracked items no longer present in the manifest.
    pub stale: Vec<ItemId>,
}

/// On-disk state of a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftState {
    /// File matches the recorded hash.
    Clean,
    /// File differs from what was installed.
    Modified,
    /// File is gone.
    Missing,
    /// Lives in the merge document.
    Merged,
    /// Meta item without a file.
    Meta,
}

impl fmt::Display for DriftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clean => "clean",
            Self::Modified => "modified",
            Self::Missing => "missing",
            Self::Merged => "merged",
            Self::Meta => "meta",
        })
    }
}

/// Status line for one tracked item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: ItemId,
    pub state: DriftState,
    pub installed_path: Option<PathBuf>,
    /// Whether the manifest still has the item.
    pub in_manifest: bool,
}

/// Merge items waiting for the merge document to be written.
struct PendingMerge {
    id: ItemId,
    hash: String,
}

/// Installs items from one manifest into one project for one target.
#[derive(Debug, Clone, Copy)]
pub struct Installer<'a> {
    manifest: &'a Manifest,
    target: &'a Target,
    project_dir: &'a Path,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub const fn new(manifest: &'a Manifest, target: &'a Target, project_dir: &'a Path) -> Self {
        Self {
            manifest,
            target,
            project_dir,
        }
    }

    /// Install `ids` and their dependencies.
    pub fn install(&self, ids: &[ItemId], options: InstallOptions) -> Result<InstallResult> {
        let resolution = Resolver::new(self.manifest).resolve(ids)?;
        if !resolution.missing.is_empty() {
            return Err(CapmError::MissingDependencies {
                missing: resolution.missing,
            }
            .into());
        }

        let _lock = if options.dry_run {
            None
        } else {
            Some(ProjectLock::acquire(self.project_dir)?)
        };
        let mut tracker = Tracker::load(self.project_dir)?;

        let mut result = InstallResult {
            dry_run: options.dry_run,
            ..InstallResult::default()
        };
        let mut merge = MergeContent::new();
        let mut pending = Vec::new();

        for id in &resolution.order {
            if let Err(e) =
                self.install_one(id, options, &mut tracker, &mut merge, &mut pending, &mut result)
            {
                debug!(item = %id, error = %e, "Item failed to install");
                result.errors.push(InstallError {
                    id: id.clone(),
                    message: format!("{e:#}"),
                });
            }
        }

        if !pending.is_empty() {
            self.write_merge_document(&mut tracker, &mut merge, pending, options, &mut result);
        }

        tracker.target = self.target.name.clone();
        tracker.registry_path = self.manifest.registry_path().to_path_buf();
        if !options.dry_run {
            tracker.save(self.project_dir)?;
        }

        debug!(
            installed = result.installed.len(),
            updated = result.updated.len(),
            skipped = result.skipped.len(),
            merged = result.merged.len(),
            errors = result.errors.len(),
            dry_run = options.dry_run,
            "Install complete"
        );
        Ok(result)
    }

    fn install_one(
        &self,
        id: &ItemId,
        options: InstallOptions,
        tracker: &mut Tracker,
        merge: &mut MergeContent,
        pending: &mut Vec<PendingMerge>,
        result: &mut InstallResult,
    ) -> Result<()> {
        let item = self.item(id)?;
        let content = self.render(item)?;
        let hash = content_hash(&content);
        let unchanged = !options.force && tracker.has_hash(id, &hash);
        trace!(item = %id, %hash, unchanged, "Transformed item");

        match id.item_type().category() {
            ItemCategory::Merge => {
                merge.add(item, content);
                if unchanged && tracked_at(tracker, id, &self.target.merge_path()) {
                    result.skipped.push(id.clone());
                } else {
                    result.merged.push(id.clone());
                    pending.push(PendingMerge {
                        id: id.clone(),
                        hash,
                    });
                }
            }
            ItemCategory::Meta => {
                if id.item_type() == ItemType::Hook {
                    result.hooks.push(HookDirective {
                        id: id.clone(),
                        trigger: item.trigger.clone().unwrap_or_default(),
                        run: item.run.clone().unwrap_or_default(),
                    });
                }
                if !unchanged {
                    tracker.record(
                        id,
                        Installation {
                            source_hash: hash,
                            installed_path: None,
                            extra_files: Vec::new(),
                            merged: false,
                        },
                    );
                }
                result.skipped.push(id.clone());
            }
            ItemCategory::Install => {
                let relative = self.target.get_path(id.item_type(), id.name())?;
                if !is_safe_path(self.project_dir, &relative) {
                    return Err(anyhow::anyhow!(
                        "Destination {} is outside the project directory",
                        relative.display()
                    ));
                }
                if unchanged && tracked_at(tracker, id, &relative) {
                    result.skipped.push(id.clone());
                    return Ok(());
                }

                let destination = self.project_dir.join(&relative);
                let extras = self.extra_files(item, &relative)?;

                if !options.dry_run {
                    atomic_write(&destination, content.as_bytes())
                        .with_context(|| format!("Failed to write {}", destination.display()))?;
                    for (from, to) in &extras {
                        let to = self.project_dir.join(to);
                        ensure_parent_dir(&to)?;
                        fs::copy(from, &to).with_context(|| {
                            format!("Failed to copy {} to {}", from.display(), to.display())
                        })?;
                    }
                }

                let existed = tracker.record(
                    id,
                    Installation {
                        source_hash: hash,
                        installed_path: Some(relative),
                        extra_files: extras.into_iter().map(|(_, to)| to).collect(),
                        merged: false,
                    },
                );
                if existed {
                    result.updated.push(id.clone());
                } else {
                    result.installed.push(id.clone());
                }
            }
        }
        Ok(())
    }

    /// Source paths and project-relative destinations of an item's extra
    /// files, checked before anything is written.
    fn extra_files(&self, item: &Item, destination: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
        let dest_dir = destination.parent().unwrap_or(Path::new(""));
        let mut pairs = Vec::with_capacity(item.files.len());

        for file in &item.files {
            let relative = Path::new(file);
            if !is_safe_path(&item.source_dir, relative)
                || !is_safe_path(&self.project_dir.join(dest_dir), relative)
            {
                return Err(anyhow::anyhow!("Extra file '{file}' escapes its directory"));
            }
            let from = item.source_dir.join(relative);
            if !from.is_file() {
                return Err(anyhow::anyhow!("Extra file not found: {}", from.display()));
            }
            pairs.push((from, dest_dir.join(relative)));
        }
        Ok(pairs)
    }

    /// Regenerate the merge document and record the pending merge items.
    ///
    /// Sections of merge items installed by earlier runs are re-rendered so
    /// the document always covers every tracked merge item.
    fn write_merge_document(
        &self,
        tracker: &mut Tracker,
        merge: &mut MergeContent,
        pending: Vec<PendingMerge>,
        options: InstallOptions,
        result: &mut InstallResult,
    ) {
        let earlier: Vec<ItemId> =
            tracker.merged_ids().filter(|id| !merge.contains(id)).cloned().collect();
        for id in earlier {
            let Some(item) = self.manifest.get(&id) else {
                debug!(item = %id, "Tracked merge item no longer in manifest; dropping its section");
                continue;
            };
            match self.render(item) {
                Ok(content) => {
                    merge.add(item, content);
                }
                Err(e) => result.errors.push(InstallError {
                    id,
                    message: format!("{e:#}"),
                }),
            }
        }

        let relative = self.target.merge_path();
        let path = self.project_dir.join(&relative);
        let written = fs::read_to_string(&path)
            .or_else(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ok(String::new())
                } else {
                    Err(e)
                }
            })
            .with_context(|| format!("Cannot read merge file: {}", path.display()))
            .and_then(|existing| {
                let updated = update_existing_file(&existing, &merge.generate());
                if options.dry_run {
                    return Ok(());
                }
                atomic_write(&path, updated.as_bytes())
                    .with_context(|| format!("Failed to write merge file: {}", path.display()))
            });

        match written {
            Ok(()) => {
                for entry in pending {
                    tracker.record(
                        &entry.id,
                        Installation {
                            source_hash: entry.hash,
                            installed_path: Some(relative.clone()),
                            extra_files: Vec::new(),
                            merged: true,
                        },
                    );
                }
                result.merge_file = Some(relative);
            }
            Err(e) => {
                let message = format!("{e:#}");
                result.merged.retain(|id| !pending.iter().any(|p| &p.id == id));
                for entry in pending {
                    result.errors.push(InstallError {
                        id: entry.id,
                        message: message.clone(),
                    });
                }
            }
        }
    }

    /// Remove tracked items and the extra files copied with them.
    ///
    /// Merged items are skipped: their section stays in the merge document.
    pub fn uninstall(&self, ids: &[ItemId], dry_run: bool) -> Result<UninstallResult> {
        let _lock = if dry_run {
            None
        } else {
            Some(ProjectLock::acquire(self.project_dir)?)
        };
        let mut tracker = Tracker::load(self.project_dir)?;
        let mut result = UninstallResult {
            dry_run,
            ..UninstallResult::default()
        };

        for id in ids {
            let Some(entry) = tracker.get(id) else {
                result.not_found.push(id.clone());
                continue;
            };
            if entry.merged {
                result.skipped.push(id.clone());
                continue;
            }

            if !dry_run {
                // Deepest extras first, the item's own file last.
                let mut files: Vec<&PathBuf> = entry.extra_files.iter().collect();
                files.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
                files.extend(&entry.installed_path);

                if let Err(message) = self.remove_files(&files) {
                    result.errors.push(InstallError {
                        id: id.clone(),
                        message,
                    });
                    continue;
                }
            }

            tracker.remove(id);
            result.uninstalled.push(id.clone());
        }

        if !dry_run {
            tracker.save(self.project_dir)?;
        }
        debug!(
            uninstalled = result.uninstalled.len(),
            skipped = result.skipped.len(),
            not_found = result.not_found.len(),
            dry_run,
            "Uninstall complete"
        );
        Ok(result)
    }

    /// Remove project-relative files, pruning directories they leave empty.
    fn remove_files(&self, files: &[&PathBuf]) -> std::result::Result<(), String> {
        for relative in files {
            let path = self.project_dir.join(relative);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(format!("Failed to remove {}: {e}", path.display())),
            }
            if let Some(parent) = path.parent() {
                remove_dir_if_empty(parent);
            }
        }
        Ok(())
    }

    /// Reinstall every tracked item still present in the manifest.
    pub fn update(&self, options: InstallOptions) -> Result<UpdateResult> {
        let tracker = Tracker::load(self.project_dir)?;
        let (current, stale): (Vec<ItemId>, Vec<ItemId>) =
            tracker.items.keys().cloned().partition(|id| self.manifest.contains(id));

        let install = if current.is_empty() {
            InstallResult {
                dry_run: options.dry_run,
                ..InstallResult::default()
            }
        } else {
            self.install(&current, options)?
        };

        Ok(UpdateResult {
            install,
            stale,
        })
    }

    /// Compare every tracked file with what was installed.
    pub fn status(&self) -> Result<Vec<StatusEntry>> {
        let tracker = Tracker::load(self.project_dir)?;
        let mut entries = Vec::with_capacity(tracker.len());

        for (id, tracked) in &tracker.items {
            let state = if tracked.merged {
                DriftState::Merged
            } else if let Some(relative) = &tracked.installed_path {
                let path = self.project_dir.join(relative);
                if !path.is_file() {
                    DriftState::Missing
                } else if tracked.source_hash.as_deref() == Some(file_hash(&path)?.as_str()) {
                    DriftState::Clean
                } else {
                    DriftState::Modified
                }
            } else {
                DriftState::Meta
            };

            entries.push(StatusEntry {
                id: id.clone(),
                state,
                installed_path: tracked.installed_path.clone(),
                in_manifest: self.manifest.contains(id),
            });
        }
        Ok(entries)
    }

    fn item(&self, id: &ItemId) -> Result<&'a Item> {
        self.manifest.get(id).ok_or_else(|| {
            CapmError::ItemNotFound {
                id: id.to_string(),
                suggestions: Vec::new(),
            }
            .into()
        })
    }

    /// Read an item's source file and transform it for the target.
    fn render(&self, item: &Item) -> Result<String> {
        let source = self.manifest.registry_path().join(&item.source);
        let raw = fs::read_to_string(&source)
            .with_context(|| format!("Cannot read item source: {}", source.display()))?;
        Ok(Transformer::new(self.target).transform(item, &raw)?)
    }
}

/// Whether `id` is tracked at `relative`, so an unchanged hash can be skipped.
fn tracked_at(tracker: &Tracker, id: &ItemId, relative: &Path) -> bool {
    tracker.get(id).and_then(|t| t.installed_path.as_deref()) == Some(relative)
}
