//! Error handling for CAPM
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`CapmError`]) for every failure a caller may
//!    want to match on: unknown items, dependency cycles, missing dependencies,
//!    unreadable persisted state.
//! 2. **User-friendly messages** ([`ErrorContext`]) with a suggestion and
//!    details, produced only at the CLI boundary by [`user_friendly_error`].
//!
//! Graph, resolver and target lookups return `Result<_, CapmError>` directly.
//! Filesystem-facing operations return [`anyhow::Result`] and attach file
//! context; the typed error stays reachable through `downcast_ref`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use capm_cli::core::{CapmError, user_friendly_error};
//!
//! let err = anyhow::Error::from(CapmError::ItemNotFound {
//!     id: "skill:reviw".to_string(),
//!     suggestions: vec!["skill:review".to_string()],
//! });
//! let ctx = user_friendly_error(err);
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use super::{ItemId, ItemType};

/// The main error type for CAPM operations
#[derive(Error, Debug)]
pub enum CapmError {
    /// Registry root does not exist or is not a directory
    #[error("Registry directory not found: {path}")]
    RegistryNotFound {
        /// Path that was expected to hold the registry
        path: String,
    },

    /// A requested identifier is absent from the manifest
    #[error("Item '{id}' not found in manifest")]
    ItemNotFound {
        /// The identifier that was requested
        id: String,
        /// Close matches, best first
        suggestions: Vec<String>,
    },

    /// A `type:name` reference could not be parsed
    #[error("Invalid item identifier '{id}': {reason}")]
    InvalidItemId {
        /// The raw identifier
        id: String,
        /// Why it was rejected
        reason: String,
    },

    /// A type string is not part of the closed type set
    #[error("Unknown item type '{item_type}'")]
    InvalidItemType {
        /// The raw type string
        item_type: String,
    },

    /// The dependency graph contains a cycle
    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    CircularDependency {
        /// Ordered cycle path; the first node is repeated at the end
        cycle: Vec<ItemId>,
    },

    /// Dependencies referenced by a resolution are absent from the manifest
    #[error("Missing dependencies: {}", join_ids(.missing))]
    MissingDependencies {
        /// Sorted, deduplicated missing identifiers
        missing: Vec<ItemId>,
    },

    /// The target has no path rule for a type
    #[error("Target '{target}' has no path rule for item type '{item_type}'")]
    NoPathRule {
        /// Target name
        target: String,
        /// Type without a rule
        item_type: ItemType,
    },

    /// No target with the requested name is known
    #[error("Unknown target '{name}'")]
    UnknownTarget {
        /// Requested target name
        name: String,
        /// Names that are available
        available: Vec<String>,
    },

    /// A target declaration is semantically invalid
    #[error("Invalid target '{name}': {reason}")]
    InvalidTarget {
        /// Target name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A target declaration file could not be parsed
    #[error("Invalid target declaration in {file}: {reason}")]
    TargetParseError {
        /// Declaration file
        file: String,
        /// Parser message
        reason: String,
    },

    /// No persisted manifest exists yet
    #[error("Manifest not found at {path}")]
    ManifestNotFound {
        /// Expected manifest location
        path: String,
    },

    /// The persisted manifest is malformed
    #[error("Invalid manifest file {file}")]
    ManifestParseError {
        /// Manifest file
        file: String,
        /// Parser message
        reason: String,
    },

    /// Validation reported errors, so the manifest was not persisted
    #[error("Manifest validation failed with {errors} error(s)")]
    ValidationFailed {
        /// Number of error-severity issues
        errors: usize,
    },

    /// A persisted file was written by a newer schema
    #[error("{file} uses schema version {found}, newer than supported version {supported}")]
    UnsupportedSchemaVersion {
        /// File that carries the version
        file: String,
        /// Version found in the file
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// The tracker file is malformed
    #[error("Invalid tracker file {file}")]
    TrackerParseError {
        /// Tracker file
        file: String,
        /// Parser message
        reason: String,
    },

    /// A header or wrap template failed to render
    #[error("Failed to render template for '{item}': {reason}")]
    TemplateError {
        /// Item being transformed
        item: String,
        /// Cleaned renderer message
        reason: String,
    },

    /// Another process holds the project lock
    #[error("Timed out after {timeout_secs}s waiting for project lock {path}")]
    LockTimeout {
        /// Lock file
        path: String,
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

fn format_cycle(cycle: &[ItemId]) -> String {
    cycle.iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ")
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl Clone for CapmError {
    fn clone(&self) -> Self {
        match self {
            Self::RegistryNotFound {
                path,
            } => Self::RegistryNotFound {
                path: path.clone(),
            },
            Self::ItemNotFound {
                id,
                suggestions,
            } => Self::ItemNotFound {
                id: id.clone(),
                suggestions: suggestions.clone(),
            },
            Self::InvalidItemId {
                id,
                reason,
            } => Self::InvalidItemId {
                id: id.clone(),
                reason: reason.clone(),
            },
            Self::InvalidItemType {
                item_type,
            } => Self::InvalidItemType {
                item_type: item_type.clone(),
            },
            Self::CircularDependency {
                cycle,
            } => Self::CircularDependency {
                cycle: cycle.clone(),
            },
            Self::MissingDependencies {
                missing,
            } => Self::MissingDependencies {
                missing: missing.clone(),
            },
            Self::NoPathRule {
                target,
                item_type,
            } => Self::NoPathRule {
                target: target.clone(),
                item_type: *item_type,
            },
            Self::UnknownTarget {
                name,
                available,
            } => Self::UnknownTarget {
                name: name.clone(),
                available: available.clone(),
            },
            Self::InvalidTarget {
                name,
                reason,
            } => Self::InvalidTarget {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::TargetParseError {
                file,
                reason,
            } => Self::TargetParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ManifestNotFound {
                path,
            } => Self::ManifestNotFound {
                path: path.clone(),
            },
            Self::ManifestParseError {
                file,
                reason,
            } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ValidationFailed {
                errors,
            } => Self::ValidationFailed {
                errors: *errors,
            },
            Self::UnsupportedSchemaVersion {
                file,
                found,
                supported,
            } => Self::UnsupportedSchemaVersion {
                file: file.clone(),
                found: *found,
                supported: *supported,
            },
            Self::TrackerParseError {
                file,
                reason,
            } => Self::TrackerParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::TemplateError {
                item,
                reason,
            } => Self::TemplateError {
                item: item.clone(),
                reason: reason.clone(),
            },
            Self::LockTimeout {
                path,
                timeout_secs,
            } => Self::LockTimeout {
                path: path.clone(),
                timeout_secs: *timeout_secs,
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error is not Clone
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying a suggestion and details for display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: CapmError,
    /// What the user can do about it
    pub suggestion: Option<String>,
    /// Extra background
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: CapmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for the terminal.
///
/// Known [`CapmError`] variants anywhere in the chain get tailored
/// suggestions; everything else is reported with its full context chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(capm_error) = error.chain().find_map(|e| e.downcast_ref::<CapmError>()) {
        let ctx = create_error_context(capm_error.clone());
        let outer = error.to_string();
        if outer != ctx.error.to_string() && ctx.details.is_none() {
            return ctx.with_details(outer);
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(CapmError::Other {
                message: format!("{error:#}"),
            })
            .with_suggestion("Check file ownership and permissions of the project directory");
        }
    }

    ErrorContext::new(CapmError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: CapmError) -> ErrorContext {
    match &error {
        CapmError::RegistryNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Pass --registry <DIR> or set `registry` in ~/.capm/config.toml"),

        CapmError::ItemNotFound { suggestions, .. } => {
            let suggestion = if suggestions.is_empty() {
                "Run 'capm list' to see available items, or 'capm build' if the registry changed"
                    .to_string()
            } else {
                format!("Did you mean: {}?", suggestions.join(", "))
            };
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        CapmError::InvalidItemId { .. } | CapmError::InvalidItemType { .. } => {
            ErrorContext::new(error).with_suggestion(
                "Identifiers use the form type:name, e.g. skill:code-review. Valid types: \
                 skill, subagent, command, mcp, script, doc, prompt, project, philosophy, \
                 ruleset, stack, hook",
            )
        }

        CapmError::CircularDependency { .. } => ErrorContext::new(error)
            .with_suggestion("Remove one of the `deps` entries along the cycle")
            .with_details("Dependencies must form a directed acyclic graph to compute an install order"),

        CapmError::MissingDependencies { .. } => ErrorContext::new(error)
            .with_suggestion("Add the missing items to the registry or drop them from `deps`, then run 'capm build'"),

        CapmError::NoPathRule { .. } => ErrorContext::new(error)
            .with_suggestion("Add a `paths` entry for this type to the target declaration"),

        CapmError::UnknownTarget { available, .. } => {
            let suggestion = format!("Available targets: {}", available.join(", "));
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        CapmError::ManifestNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'capm build' to scan the registry and write the manifest"),

        CapmError::ManifestParseError { reason, .. } => {
            let details = reason.clone();
            ErrorContext::new(error)
                .with_suggestion("Rebuild the manifest with 'capm build'")
                .with_details(details)
        }

        CapmError::ValidationFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'capm validate' to list the issues and fix the reported files"),

        CapmError::UnsupportedSchemaVersion { .. } => ErrorContext::new(error)
            .with_suggestion("Update capm to the latest version"),

        CapmError::TrackerParseError { reason, .. } => {
            let details = reason.clone();
            ErrorContext::new(error)
                .with_suggestion("Fix or delete .capm/installed.json; deleting it forgets what was installed")
                .with_details(details)
        }

        CapmError::LockTimeout { .. } => ErrorContext::new(error)
            .with_suggestion("Another capm process is working on this project; wait for it to finish"),

        _ => ErrorContext::new(error),
    }
}
