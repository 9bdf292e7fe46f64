//! Registry scanner.
//!
//! Walks a registry directory, parses the `capsule:` block of every markdown
//! file and sorts each file into one of three outcomes:
//!
//! - an [`Item`] when the block names a type and/or a name,
//! - *skipped* when there is no block or the block has neither,
//! - a [`ScanError`] when the block is malformed or the entry is unreadable.
//!
//! A bad file or subdirectory never aborts the walk. Symlinks are followed;
//! loops and dangling links are reported as scan errors. Hidden directories
//! and the build-output directory are not visited. Entries are visited in file-name order so the
//! result is stable across runs.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::constants::{BUILD_DIR, METADATA_KEY};
use crate::core::{CapmError, Item};
use crate::markdown::{self, FrontmatterProblem};

/// A file whose metadata block could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// File path relative to the registry root.
    pub path: PathBuf,
    /// Diagnosis of what is wrong.
    pub problem: FrontmatterProblem,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.problem)
    }
}

/// Outcome of a registry scan.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub items: Vec<Item>,
    pub errors: Vec<ScanError>,
    /// Markdown files without capsule metadata, relative to the root.
    pub skipped: Vec<PathBuf>,
}

/// What a single file turned out to be.
#[derive(Debug)]
enum FileOutcome {
    Item(Box<Item>),
    Skipped,
}

/// Scans one registry root.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the registry.
    ///
    /// Fails only when the root itself is missing or unreadable; problems
    /// with individual entries are collected in the result.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root.is_dir() {
            return Err(CapmError::RegistryNotFound {
                path: self.root.display().to_string(),
            }
            .into());
        }

        let mut result = ScanResult::default();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(err).with_context(|| {
                        format!("Failed to read registry directory: {}", self.root.display())
                    });
                }
                Err(err) => {
                    let path = err.path().unwrap_or(self.root.as_path());
                    let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
                    debug!(path = %relative.display(), error = %err, "Skipping unreadable registry entry");
                    result.errors.push(ScanError {
                        path: relative,
                        problem: FrontmatterProblem::Unreadable {
                            message: err.to_string(),
                        },
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() || !markdown::is_markdown_file(entry.path()) {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            match self.scan_file(entry.path(), relative) {
                Ok(FileOutcome::Item(item)) => {
                    trace!(source = %relative.display(), "Scanned item {}", item.label());
                    result.items.push(*item);
                }
                Ok(FileOutcome::Skipped) => result.skipped.push(relative.to_path_buf()),
                Err(problem) => result.errors.push(ScanError {
                    path: relative.to_path_buf(),
                    problem,
                }),
            }
        }

        debug!(
            root = %self.root.display(),
            items = result.items.len(),
            errors = result.errors.len(),
            skipped = result.skipped.len(),
            "Registry scan complete"
        );
        Ok(result)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || (entry.depth() == 1 && name == BUILD_DIR)
    }

    fn scan_file(&self, path: &Path, relative: &Path) -> Result<FileOutcome, FrontmatterProblem> {
        let text = std::fs::read_to_string(path).map_err(|e| FrontmatterProblem::Unreadable {
            message: e.to_string(),
        })?;

        let Some(mut item) = parse_item(&text)? else {
            return Ok(FileOutcome::Skipped);
        };
        item.source = relative.to_path_buf();
        item.source_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        Ok(FileOutcome::Item(Box::new(item)))
    }
}

/// Parse the capsule metadata of one markdown document.
///
/// Returns `Ok(None)` when the document has no metadata block, no `capsule`
/// key, or a block naming neither a type nor a name. The returned item has
/// its `content` set to the body; source fields are left for the caller.
pub fn parse_item(text: &str) -> Result<Option<Item>, FrontmatterProblem> {
    let doc = markdown::split_frontmatter(text)?;
    let Some(raw) = doc.frontmatter else {
        return Ok(None);
    };

    let value = markdown::parse_yaml(&raw)?;
    let Some(block) = value.get(METADATA_KEY).filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let mut item: Item = serde_yaml::from_value(block.clone()).map_err(|e| {
        FrontmatterProblem::InvalidMetadata {
            message: e.to_string(),
        }
    })?;
    if item.kind.trim().is_empty() && item.name.trim().is_empty() {
        return Ok(None);
    }

    item.content = doc.body;
    Ok(Some(item))
}
