//! CAPM - Capsule Package Manager
//!
//! Installs markdown "capsules" (skills, subagents, commands, rulesets, ...)
//! from a local registry into a project laid out for a coding-assistant tool.
//!
//! # Architecture Overview
//!
//! The library is a synchronous pipeline; the `capm` binary is a thin async
//! CLI on top of it.
//!
//! ```text
//! registry/*.md ─▶ Scanner ─▶ validation ─▶ Manifest ─▶ Resolver ─▶ Installer ─▶ project
//!                                          (build/manifest.json)     │
//!                                                    Target + Transformer, MergeContent, Tracker
//! ```
//!
//! 1. [`scanner`] walks the registry and parses each file's `capsule:`
//!    metadata block into an [`core::Item`].
//! 2. [`validation`] checks items alone and as a batch (duplicates, dangling
//!    dependencies).
//! 3. [`manifest`] indexes items by [`core::ItemId`] (`type:name`) and
//!    persists the snapshot.
//! 4. [`resolver`] computes a dependencies-first install order over a
//!    `petgraph` graph, failing on unknown items and cycles.
//! 5. [`target`] maps item types to destination paths and transforms content
//!    (strip metadata, add a header, wrap) with Tera templates.
//! 6. [`installer`] writes install-type items, splices merge-type items into
//!    one merge file between sentinel markers, and records everything in the
//!    per-project [`tracker`].
//!
//! # Core Modules
//!
//! - [`core`] - Item types, identities and errors
//! - [`markdown`] - Frontmatter splitting with readable parse diagnostics
//! - [`scanner`] - Registry discovery
//! - [`validation`] - Per-item and cross-item checks
//! - [`manifest`] - Indexed registry, persisted as JSON
//! - [`resolver`] - Dependency graph, ordering and cycle detection
//! - [`target`] - Target layouts and content transformation
//! - [`installer`] - Install, uninstall, update, status
//! - [`tracker`] - Per-project record of installed items
//!
//! ## Supporting Modules
//! - [`cli`] - Command-line interface
//! - [`config`] - `~/.capm/config.toml`
//! - [`constants`] - File names, markers and limits
//! - [`utils`] - Atomic writes, path checks and spinners
//!
//! # Example
//!
//! ```rust,no_run
//! use capm_cli::installer::{InstallOptions, Installer};
//! use capm_cli::manifest::Manifest;
//! use capm_cli::target::Target;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let manifest = Manifest::build(Path::new("registry"))?.manifest;
//! let target = Target::default_target();
//! let result = Installer::new(&manifest, &target, Path::new("my-project"))
//!     .install(&["skill:code-review".parse()?], InstallOptions::default())?;
//! println!("{} installed, {} merged", result.installed.len(), result.merged.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod installer;
pub mod manifest;
pub mod markdown;
pub mod resolver;
pub mod scanner;
pub mod target;
pub mod tracker;
pub mod utils;
pub mod validation;

// Test utilities (available to unit tests and to integration tests via the feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
