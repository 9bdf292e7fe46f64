//! Registry fixtures.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::manifest::Manifest;

/// A capsule file to write into a fixture registry.
#[derive(Debug, Clone)]
pub struct Capsule {
    kind: String,
    name: String,
    desc: String,
    deps: Vec<String>,
    tags: Vec<String>,
    files: Vec<String>,
    order: Option<i64>,
    trigger: Option<String>,
    run: Option<String>,
    body: String,
    path: Option<String>,
}

impl Capsule {
    /// A valid capsule with a description, one tag and a small body.
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            desc: format!("Fixture {kind} named {name}"),
            deps: Vec::new(),
            tags: vec!["fixture".to_string()],
            files: Vec::new(),
            order: None,
            trigger: None,
            run: None,
            body: format!("# {name}\n\nBody of {kind}:{name}.\n"),
            path: None,
        }
    }

    pub fn deps(mut self, deps: &[&str]) -> Self {
        self.deps = deps.iter().map(ToString::to_string).collect();
        self
    }

    pub fn files(mut self, files: &[&str]) -> Self {
        self.files = files.iter().map(ToString::to_string).collect();
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn desc(mut self, desc: &str) -> Self {
        self.desc = desc.to_string();
        self
    }

    pub fn hook(mut self, trigger: &str, run: &str) -> Self {
        self.trigger = Some(trigger.to_string());
        self.run = Some(run.to_string());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Registry-relative path; defaults to `<type>/<name>.md`.
    pub fn at(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    #[must_use]
    pub fn relative_path(&self) -> String {
        self.path.clone().unwrap_or_else(|| format!("{}/{}.md", self.kind, self.name))
    }

    /// Full markdown text with the `capsule:` block.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let list = |values: &[String]| format!("[{}]", values.join(", "));
        let mut meta = format!(
            "capsule:\n  type: {}\n  name: {}\n  desc: \"{}\"\n  tags: {}\n",
            self.kind,
            self.name,
            self.desc,
            list(&self.tags)
        );
        if !self.deps.is_empty() {
            meta.push_str(&format!("  deps: {}\n", list(&self.deps)));
        }
        if !self.files.is_empty() {
            meta.push_str(&format!("  files: {}\n", list(&self.files)));
        }
        if let Some(order) = self.order {
            meta.push_str(&format!("  order: {order}\n"));
        }
        if let Some(trigger) = &self.trigger {
            meta.push_str(&format!("  trigger: \"{trigger}\"\n"));
        }
        if let Some(run) = &self.run {
            meta.push_str(&format!("  run: \"{run}\"\n"));
        }
        format!("---\n{meta}---\n\n{}", self.body)
    }
}

/// A temporary registry plus an empty destination project.
pub struct RegistryFixture {
    _temp: TempDir,
    registry: PathBuf,
    project: PathBuf,
}

impl RegistryFixture {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let registry = temp.path().join("registry");
        let project = temp.path().join("project");
        fs::create_dir_all(&registry)?;
        fs::create_dir_all(&project)?;
        Ok(Self {
            _temp: temp,
            registry,
            project,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Path {
        &self.registry
    }

    #[must_use]
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Write a capsule; returns its absolute path.
    pub fn add(&self, capsule: Capsule) -> Result<PathBuf> {
        self.write(&capsule.relative_path(), &capsule.to_markdown())
    }

    /// Write any file under the registry.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.registry.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Scan, validate and persist; fails if validation reports errors.
    pub fn build_manifest(&self) -> Result<Manifest> {
        let outcome = Manifest::build(&self.registry)?;
        if outcome.validation.has_errors() {
            let messages: Vec<String> = outcome.validation.errors().map(ToString::to_string).collect();
            anyhow::bail!("fixture registry is invalid:\n{}", messages.join("\n"));
        }
        Ok(outcome.manifest)
    }

    /// Read a file from the destination project.
    pub fn read_project(&self, relative: &str) -> Result<String> {
        Ok(fs::read_to_string(self.project.join(relative))?)
    }
}
