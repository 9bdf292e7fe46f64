//! Integration test suite for CAPM
//!
//! End-to-end tests that drive the library and the `capm` binary against
//! temporary registries and projects.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: `capm` commands through the binary
//! - **install**: Resolve and install through the library
//! - **merge**: Merge-file behavior across runs
//! - **targets**: Declared targets from a config-supplied directory
//! - **validate**: `build` and `validate` reporting

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod install;
mod merge;
mod targets;
mod validate;
