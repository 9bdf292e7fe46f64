//! Install targets.
//!
//! A [`Target`] describes where each install type lands in a destination
//! project and how its content is transformed on the way. The built-in
//! [`Target::default_target`] needs no declaration file; more targets can be
//! declared in YAML or TOML:
//!
//! ```yaml
//! name: cursor
//! description: Cursor rules layout
//! version: "1"
//! base_dir: .cursor
//! merge_file: AGENTS.md
//! paths:
//!   skill: { dir: rules, pattern: "{name}.mdc" }
//!   doc: { dir: docs, pattern: "{name}.md", subdirs: true }
//! transforms:
//!   skill:
//!     add_header: "# {{ name }}\n"
//! ```
//!
//! Paths returned by [`Target::get_path`] are relative to the project root.
//! The merge file also lives at the project root, not under `base_dir`.

pub mod transform;

pub use transform::Transformer;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::DEFAULT_TARGET_NAME;
use crate::core::{CapmError, ItemType, is_path_safe_name};

/// Where one install type is written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathRule {
    /// Subdirectory under the target's base directory.
    pub dir: String,
    /// File name; `{name}` is replaced by the item name.
    pub pattern: String,
    /// Nest each item under a directory named after it.
    #[serde(default)]
    pub subdirs: bool,
}

/// How one type's content is rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransformRule {
    /// Template that replaces the whole content.
    #[serde(default)]
    pub wrap_with: Option<String>,
    #[serde(default = "default_strip")]
    pub strip_frontmatter: bool,
    /// Template prepended to the content.
    #[serde(default)]
    pub add_header: Option<String>,
}

const fn default_strip() -> bool {
    true
}

impl Default for TransformRule {
    fn default() -> Self {
        Self {
            wrap_with: None,
            strip_frontmatter: true,
            add_header: None,
        }
    }
}

/// On-disk declaration; type keys are checked when converting to [`Target`].
#[derive(Debug, Deserialize)]
struct TargetDecl {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    base_dir: PathBuf,
    merge_file: String,
    #[serde(default)]
    paths: BTreeMap<String, PathRule>,
    #[serde(default)]
    transforms: BTreeMap<String, TransformRule>,
}

/// A destination layout. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub description: String,
    pub version: String,
    pub base_dir: PathBuf,
    pub merge_file: String,
    pub paths: BTreeMap<ItemType, PathRule>,
    pub transforms: BTreeMap<ItemType, TransformRule>,
}

const CLAUDE_HEADER: &str = "---\nname: {{ name }}\ndescription: {{ desc }}\n---\n";

impl Target {
    /// The built-in `claude` layout.
    #[must_use]
    pub fn default_target() -> Self {
        let flat = |dir: &str| PathRule {
            dir: dir.to_string(),
            pattern: "{name}.md".to_string(),
            subdirs: false,
        };

        let paths = BTreeMap::from([
            (
                ItemType::Skill,
                PathRule {
                    dir: "skills".to_string(),
                    pattern: "SKILL.md".to_string(),
                    subdirs: true,
                },
            ),
            (ItemType::Subagent, flat("agents")),
            (ItemType::Command, flat("commands")),
            (ItemType::Mcp, flat("mcp")),
            (ItemType::Script, flat("scripts")),
            (ItemType::Doc, flat("docs")),
            (ItemType::Prompt, flat("prompts")),
        ]);

        let header = TransformRule {
            add_header: Some(CLAUDE_HEADER.to_string()),
            ..TransformRule::default()
        };
        let transforms =
            BTreeMap::from([(ItemType::Skill, header.clone()), (ItemType::Subagent, header)]);

        Self {
            name: DEFAULT_TARGET_NAME.to_string(),
            description: "Claude Code project layout".to_string(),
            version: "1".to_string(),
            base_dir: PathBuf::from(".claude"),
            merge_file: "CLAUDE.md".to_string(),
            paths,
            transforms,
        }
    }

    /// Load a declaration from a `.yaml`, `.yml` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read target declaration: {}", path.display()))?;
        Ok(Self::parse(&text, path)?)
    }

    /// Parse declaration text; the format is chosen by `origin`'s extension.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, CapmError> {
        let parse_error = |reason: String| CapmError::TargetParseError {
            file: origin.display().to_string(),
            reason,
        };

        let extension =
            origin.extension().and_then(|e| e.to_str()).map(str::to_lowercase).unwrap_or_default();
        let decl: TargetDecl = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            "toml" => toml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            other => return Err(parse_error(format!("unsupported declaration format '{other}'"))),
        };
        Self::from_decl(decl)
    }

    fn from_decl(decl: TargetDecl) -> Result<Self, CapmError> {
        let invalid = |reason: String| CapmError::InvalidTarget {
            name: decl.name.clone(),
            reason,
        };

        if decl.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if decl.merge_file.trim().is_empty() {
            return Err(invalid("merge_file is empty".to_string()));
        }

        let mut paths = BTreeMap::new();
        for (key, rule) in &decl.paths {
            let item_type: ItemType =
                key.parse().map_err(|_| invalid(format!("unknown item type '{key}' in paths")))?;
            if !item_type.is_install() {
                return Err(invalid(format!(
                    "'{item_type}' items are never written as files and cannot have a path rule"
                )));
            }
            if rule.pattern.trim().is_empty() {
                return Err(invalid(format!("path rule for '{item_type}' has an empty pattern")));
            }
            paths.insert(item_type, rule.clone());
        }

        let mut transforms = BTreeMap::new();
        for (key, rule) in &decl.transforms {
            let item_type: ItemType = key
                .parse()
                .map_err(|_| invalid(format!("unknown item type '{key}' in transforms")))?;
            transforms.insert(item_type, rule.clone());
        }

        Ok(Self {
            name: decl.name,
            description: decl.description,
            version: decl.version,
            base_dir: decl.base_dir,
            merge_file: decl.merge_file,
            paths,
            transforms,
        })
    }

    /// Destination of an item, relative to the project root.
    ///
    /// Merge and meta types never have a rule and always fail here.
    pub fn get_path(&self, item_type: ItemType, name: &str) -> Result<PathBuf, CapmError> {
        let rule = self.paths.get(&item_type).ok_or_else(|| CapmError::NoPathRule {
            target: self.name.clone(),
            item_type,
        })?;
        if !is_path_safe_name(name) {
            return Err(CapmError::InvalidItemId {
                id: format!("{item_type}:{name}"),
                reason: "name must not contain path separators or '..'".to_string(),
            });
        }

        let mut path = self.base_dir.join(&rule.dir);
        if rule.subdirs {
            path.push(name);
        }
        path.push(rule.pattern.replace("{name}", name));
        Ok(path)
    }

    /// Transform rule for a type; types without one only strip the metadata
    /// block.
    #[must_use]
    pub fn transform_rule(&self, item_type: ItemType) -> TransformRule {
        self.transforms.get(&item_type).cloned().unwrap_or_default()
    }

    /// Merge document path relative to the project root.
    #[must_use]
    pub fn merge_path(&self) -> PathBuf {
        PathBuf::from(&self.merge_file)
    }
}

/// The set of known targets, keyed by name.
#[derive(Debug, Clone)]
pub struct Targets {
    targets: BTreeMap<String, Target>,
}

impl Default for Targets {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Targets {
    /// Only the built-in target.
    #[must_use]
    pub fn builtin() -> Self {
        let default = Target::default_target();
        Self {
            targets: BTreeMap::from([(default.name.clone(), default)]),
        }
    }

    /// The built-in target plus every declaration in `dir`.
    ///
    /// A declaration named like the built-in replaces it. A missing directory
    /// yields just the built-in.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut targets = Self::builtin();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "No target directory; using built-in target only");
            return Ok(targets);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Cannot read target directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_declaration(p))
            .collect();
        files.sort();

        for file in files {
            let target = Target::load(&file)?;
            debug!(target = %target.name, file = %file.display(), "Loaded target declaration");
            targets.insert(target);
        }
        Ok(targets)
    }

    pub fn insert(&mut self, target: Target) {
        self.targets.insert(target.name.clone(), target);
    }

    pub fn get(&self, name: &str) -> Result<&Target, CapmError> {
        self.targets.get(name).ok_or_else(|| CapmError::UnknownTarget {
            name: name.to_string(),
            available: self.names(),
        })
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }
}

fn is_declaration(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml" | "toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_target_paths() {
        let target = Target::default_target();
        assert_eq!(
            target.get_path(ItemType::Skill, "code-review").unwrap(),
            PathBuf::from(".claude/skills/code-review/SKILL.md")
        );
        assert_eq!(
            target.get_path(ItemType::Subagent, "planner").unwrap(),
            PathBuf::from(".claude/agents/planner.md")
        );
        assert_eq!(target.merge_path(), PathBuf::from("CLAUDE.md"));
    }

    #[test]
    fn test_merge_and_meta_types_have_no_path() {
        let target = Target::default_target();
        for item_type in [ItemType::Project, ItemType::Ruleset, ItemType::Stack, ItemType::Hook] {
            let err = target.get_path(item_type, "x").unwrap_err();
            assert!(matches!(err, CapmError::NoPathRule { .. }));
        }
    }

    #[test]
    fn test_path_like_names_are_rejected() {
        let target = Target::default_target();
        for name in ["../../escaped", "/abs/x", "nested/x", "..", "c:x"] {
            let err = target.get_path(ItemType::Doc, name).unwrap_err();
            assert!(matches!(err, CapmError::InvalidItemId { .. }), "{name} should be rejected");
        }
    }

    #[test]
    fn test_missing_transform_rule_strips_only() {
        let rule = Target::default_target().transform_rule(ItemType::Doc);
        assert!(rule.strip_frontmatter);
        assert!(rule.add_header.is_none());
        assert!(rule.wrap_with.is_none());
    }

    #[test]
    fn test_parse_yaml_declaration() {
        let yaml = "name: cursor\nbase_dir: .cursor\nmerge_file: AGENTS.md\npaths:\n  skill: { dir: rules, pattern: \"{name}.mdc\" }\ntransforms:\n  skill:\n    strip_frontmatter: false\n";
        let target = Target::parse(yaml, Path::new("cursor.yaml")).unwrap();
        assert_eq!(
            target.get_path(ItemType::Skill, "x").unwrap(),
            PathBuf::from(".cursor/rules/x.mdc")
        );
        assert!(!target.transform_rule(ItemType::Skill).strip_frontmatter);
        assert!(target.get_path(ItemType::Doc, "x").is_err());
    }

    #[test]
    fn test_parse_toml_declaration() {
        let toml = r#"
name = "plain"
merge_file = "README.md"

[paths.doc]
dir = "docs"
pattern = "{name}.md"
subdirs = true

[transforms.doc]
wrap_with = "{{ content }}"
"#;
        let target = Target::parse(toml, Path::new("plain.toml")).unwrap();
        assert_eq!(target.get_path(ItemType::Doc, "guide").unwrap(), PathBuf::from("docs/guide/guide.md"));
        assert_eq!(target.transform_rule(ItemType::Doc).wrap_with.as_deref(), Some("{{ content }}"));
    }

    #[test]
    fn test_rejects_path_rule_for_merge_type() {
        let yaml = "name: bad\nmerge_file: X.md\npaths:\n  ruleset: { dir: rules, pattern: \"{name}.md\" }\n";
        let err = Target::parse(yaml, Path::new("bad.yml")).unwrap_err();
        assert!(matches!(err, CapmError::InvalidTarget { .. }));

        let yaml = "name: bad\nmerge_file: X.md\npaths:\n  widget: { dir: w, pattern: \"{name}.md\" }\n";
        assert!(Target::parse(yaml, Path::new("bad.yml")).is_err());

        let err = Target::parse("name = 1", Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, CapmError::TargetParseError { .. }));
    }

    #[test]
    fn test_targets_load_dir_and_override() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("claude.yaml"),
            "name: claude\nbase_dir: .custom\nmerge_file: CLAUDE.md\npaths:\n  doc: { dir: d, pattern: \"{name}.md\" }\n",
        )
        .unwrap();
        fs::write(temp.path().join("other.toml"), "name = \"other\"\nmerge_file = \"O.md\"\n").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let targets = Targets::load_dir(temp.path()).unwrap();
        assert_eq!(targets.names(), vec!["claude", "other"]);
        let claude = targets.get("claude").unwrap();
        assert_eq!(claude.base_dir, PathBuf::from(".custom"));

        let err = targets.get("nope").unwrap_err();
        assert!(matches!(err, CapmError::UnknownTarget { ref available, .. } if available.len() == 2));

        let missing = Targets::load_dir(&temp.path().join("absent")).unwrap();
        assert_eq!(missing.names(), vec!["claude"]);
    }
}
