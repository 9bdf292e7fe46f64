//! Item type taxonomy for CAPM
//!
//! Every capsule in a registry declares one of a closed set of types. The type
//! decides what the installer does with it:
//!
//! - **Install types** (`skill`, `subagent`, `command`, `mcp`, `script`, `doc`,
//!   `prompt`) produce one destination file each, plus any declared extra files.
//! - **Merge types** (`project`, `philosophy`, `ruleset`) never produce a file of
//!   their own; their content is appended into one aggregate document.
//! - **Meta types** (`stack`, `hook`) have no installable artifact. A stack only
//!   groups dependencies; a hook carries a trigger/run directive that is recorded
//!   but never executed.
//!
//! # Examples
//!
//! ```rust
//! use capm_cli::core::{ItemCategory, ItemType};
//!
//! let skill: ItemType = "skill".parse().unwrap();
//! assert_eq!(skill.category(), ItemCategory::Install);
//! assert!(ItemType::Ruleset.is_merge());
//! assert_eq!(ItemType::Stack.to_string(), "stack");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CapmError;

/// How the installer treats an item of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    /// One standalone destination file per item.
    Install,
    /// Content aggregated into the target's merge document.
    Merge,
    /// No artifact; recorded in the tracker only.
    Meta,
}

/// Closed set of capsule types.
///
/// Serialized in lowercase (`"skill"`, `"philosophy"`, ...), which is also the
/// prefix of the canonical `type:name` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Reusable skill bundle (usually a `SKILL.md` plus helper files)
    Skill,
    /// Agent prompt installed as a sub-agent definition
    Subagent,
    /// Slash-command template
    Command,
    /// MCP server description
    Mcp,
    /// Script shipped as markdown
    Script,
    /// Reference documentation
    Doc,
    /// Standalone prompt
    Prompt,
    /// Project description merged into the aggregate document
    Project,
    /// Engineering philosophy merged into the aggregate document
    Philosophy,
    /// Rule set merged into the aggregate document
    Ruleset,
    /// Pure dependency grouping
    Stack,
    /// Trigger/run directive, recorded only
    Hook,
}

impl ItemType {
    /// Every type, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Skill,
        Self::Subagent,
        Self::Command,
        Self::Mcp,
        Self::Script,
        Self::Doc,
        Self::Prompt,
        Self::Project,
        Self::Philosophy,
        Self::Ruleset,
        Self::Stack,
        Self::Hook,
    ];

    /// Fixed section order of the merge document.
    pub const MERGE_ORDER: [Self; 3] = [Self::Project, Self::Philosophy, Self::Ruleset];

    /// Lowercase name used in identifiers and serialized forms.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Subagent => "subagent",
            Self::Command => "command",
            Self::Mcp => "mcp",
            Self::Script => "script",
            Self::Doc => "doc",
            Self::Prompt => "prompt",
            Self::Project => "project",
            Self::Philosophy => "philosophy",
            Self::Ruleset => "ruleset",
            Self::Stack => "stack",
            Self::Hook => "hook",
        }
    }

    #[must_use]
    pub const fn category(&self) -> ItemCategory {
        match self {
            Self::Skill
            | Self::Subagent
            | Self::Command
            | Self::Mcp
            | Self::Script
            | Self::Doc
            | Self::Prompt => ItemCategory::Install,
            Self::Project | Self::Philosophy | Self::Ruleset => ItemCategory::Merge,
            Self::Stack | Self::Hook => ItemCategory::Meta,
        }
    }

    #[must_use]
    pub const fn is_install(&self) -> bool {
        matches!(self.category(), ItemCategory::Install)
    }

    #[must_use]
    pub const fn is_merge(&self) -> bool {
        matches!(self.category(), ItemCategory::Merge)
    }

    #[must_use]
    pub const fn is_meta(&self) -> bool {
        matches!(self.category(), ItemCategory::Meta)
    }

    /// Section heading used when rendering merge types.
    #[must_use]
    pub const fn heading(&self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Philosophy => "Philosophy",
            Self::Ruleset => "Rules",
            _ => self.as_str(),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = CapmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == lowered).ok_or_else(|| {
            CapmError::InvalidItemType {
                item_type: s.to_string(),
            }
        })
    }
}
