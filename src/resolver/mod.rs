//! Dependency resolution against a manifest.
//!
//! [`Resolver::resolve`] turns a list of requested identifiers into an install
//! order (dependencies first) plus the list of referenced identifiers that are
//! absent from the manifest. Unknown *requested* identifiers and cycles are
//! hard errors; missing *dependencies* are data, and the installer decides
//! whether they are fatal.
//!
//! # Example
//!
//! ```rust,no_run
//! use capm_cli::manifest::Manifest;
//! use capm_cli::resolver::Resolver;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let manifest = Manifest::load(Path::new("registry"))?;
//! let resolution = Resolver::new(&manifest).resolve(&["skill:code-review".parse()?])?;
//! for id in &resolution.order {
//!     println!("{id}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod dependency_graph;

pub use dependency_graph::DependencyGraph;

use tracing::debug;

use crate::core::{CapmError, ItemId, suggest_similar};
use crate::manifest::Manifest;

/// Outcome of resolving a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Requested items and their transitive dependencies, dependencies first.
    pub order: Vec<ItemId>,
    /// Referenced identifiers absent from the manifest, sorted.
    pub missing: Vec<ItemId>,
}

impl Resolution {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Resolves requests against one manifest.
///
/// The graph is built once at construction and never changes afterwards.
#[derive(Debug)]
pub struct Resolver<'a> {
    manifest: &'a Manifest,
    graph: DependencyGraph,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(manifest: &'a Manifest) -> Self {
        Self {
            manifest,
            graph: DependencyGraph::from_manifest(manifest),
        }
    }

    #[must_use]
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Resolve `ids` into an install order.
    ///
    /// Fails before doing any work if a requested identifier is not in the
    /// manifest; the error carries close matches.
    pub fn resolve(&self, ids: &[ItemId]) -> Result<Resolution, CapmError> {
        if let Some(unknown) = ids.iter().find(|id| !self.manifest.contains(id)) {
            return Err(CapmError::ItemNotFound {
                id: unknown.to_string(),
                suggestions: suggest_similar(&unknown.to_string(), self.manifest.ids()),
            });
        }

        let order = self.graph.resolve_order(ids)?;
        let missing = self.graph.missing_in_closure(ids)?;
        debug!(
            requested = ids.len(),
            resolved = order.len(),
            missing = missing.len(),
            "Resolved dependencies"
        );

        Ok(Resolution {
            order,
            missing,
        })
    }
}

/// Parse `type:name` arguments, failing on the first malformed one.
pub fn parse_ids<S: AsRef<str>>(raw: &[S]) -> Result<Vec<ItemId>, CapmError> {
    raw.iter().map(|s| s.as_ref().parse()).collect()
}
