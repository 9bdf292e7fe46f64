//! Item validation.
//!
//! [`validate_item`] checks a single item in isolation; [`validate_items`]
//! adds the cross-item checks (duplicate identities, dependency existence).
//! Validation never mutates its input and only touches the filesystem to check
//! that declared extra files exist.
//!
//! Only [`Severity::Error`] issues block persisting a manifest.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::MIN_DESC_WORDS;
use crate::core::{Item, ItemId, ItemType, is_path_safe_name};

static KEBAB_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("kebab-case pattern is valid")
});

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Source file of the offending item, relative to the registry root.
    pub source: PathBuf,
    /// Metadata field the issue is about.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(severity: Severity, item: &Item, field: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            source: item.source.clone(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn error(item: &Item, field: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, item, field, message)
    }

    fn warning(item: &Item, field: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, item, field, message)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}: {}", self.source.display(), self.severity, self.field, self.message)
    }
}

/// A batch of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check one item independently of any other.
#[must_use]
pub fn validate_item(item: &Item) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let item_type = if item.kind.trim().is_empty() {
        issues.push(ValidationIssue::error(item, "type", "type is required"));
        None
    } else {
        match item.kind.parse::<ItemType>() {
            Ok(t) => Some(t),
            Err(_) => {
                issues.push(ValidationIssue::error(
                    item,
                    "type",
                    format!("unknown type '{}'", item.kind),
                ));
                None
            }
        }
    };

    if item.name.trim().is_empty() {
        issues.push(ValidationIssue::error(item, "name", "name is required"));
    } else if !is_path_safe_name(&item.name) {
        issues.push(ValidationIssue::error(
            item,
            "name",
            format!("name '{}' must not contain path separators or '..'", item.name),
        ));
    } else if !KEBAB_CASE.is_match(&item.name) {
        issues.push(ValidationIssue::warning(
            item,
            "name",
            format!("name '{}' should be kebab-case", item.name),
        ));
    }

    if item.desc.trim().is_empty() {
        issues.push(ValidationIssue::error(item, "desc", "desc is required"));
    } else if item.desc.split_whitespace().count() < MIN_DESC_WORDS {
        issues.push(ValidationIssue::warning(
            item,
            "desc",
            format!("desc should have at least {MIN_DESC_WORDS} words"),
        ));
    }

    for file in &item.files {
        if !item.source_dir.join(file).exists() {
            issues.push(ValidationIssue::error(
                item,
                "files",
                format!("file '{file}' not found next to {}", item.source.display()),
            ));
        }
    }

    if item.tags.is_empty() {
        issues.push(ValidationIssue::warning(item, "tags", "no tags"));
    }

    if let Some(Err(_)) = item.parsed_status() {
        issues.push(ValidationIssue::warning(
            item,
            "status",
            format!(
                "unknown status '{}' (expected draft, stable or deprecated)",
                item.status.as_deref().unwrap_or_default()
            ),
        ));
    }

    match item_type {
        Some(t) if t.is_merge() && item.order == 0 => {
            issues.push(ValidationIssue::warning(
                item,
                "order",
                "merge item has no order; sections sort by name among equal orders",
            ));
        }
        Some(ItemType::Hook) => {
            if item.trigger.as_deref().is_none_or(|t| t.trim().is_empty()) {
                issues.push(ValidationIssue::error(item, "trigger", "hook requires trigger"));
            }
            if item.run.as_deref().is_none_or(|r| r.trim().is_empty()) {
                issues.push(ValidationIssue::error(item, "run", "hook requires run"));
            }
        }
        Some(ItemType::Stack) if item.deps.is_empty() => {
            issues.push(ValidationIssue::warning(item, "deps", "stack has no deps"));
        }
        _ => {}
    }

    issues
}

/// Validate a batch: per-item checks plus duplicates and dependency existence.
///
/// For duplicates the first occurrence wins and a single error is attributed
/// to each later occurrence.
#[must_use]
pub fn validate_items(items: &[Item]) -> ValidationResult {
    let mut issues = Vec::new();
    let mut first_seen: HashMap<ItemId, &Path> = HashMap::new();

    for item in items {
        issues.extend(validate_item(item));

        if let Some(id) = item.id() {
            if let Some(first) = first_seen.get(&id) {
                issues.push(ValidationIssue::error(
                    item,
                    "name",
                    format!("duplicate item '{id}' (first defined in {})", first.display()),
                ));
            } else {
                first_seen.insert(id, &item.source);
            }
        }
    }

    let known: BTreeSet<&ItemId> = first_seen.keys().collect();
    for item in items {
        for dep in &item.deps {
            match dep.parse::<ItemId>() {
                Ok(dep_id) if known.contains(&dep_id) => {}
                Ok(dep_id) => issues.push(ValidationIssue::error(
                    item,
                    "deps",
                    format!("dependency '{dep_id}' not found"),
                )),
                Err(e) => issues.push(ValidationIssue::error(item, "deps", e.to_string())),
            }
        }
    }

    ValidationResult {
        issues,
    }
}
