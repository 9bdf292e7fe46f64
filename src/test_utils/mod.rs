//! Test utilities for CAPM
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! - [`init_test_logging`] - route `tracing` output through the test writer
//! - [`RegistryFixture`] / [`Capsule`] - build a throwaway registry and
//!   destination project on disk
//!
//! # Example
//!
//! ```rust,no_run
//! use capm_cli::test_utils::{Capsule, RegistryFixture};
//!
//! let fixture = RegistryFixture::new().unwrap();
//! fixture.add(Capsule::new("skill", "base")).unwrap();
//! fixture.add(Capsule::new("skill", "dependent").deps(&["skill:base"])).unwrap();
//! let manifest = fixture.build_manifest().unwrap();
//! assert_eq!(manifest.len(), 2);
//! ```

pub mod builder;

pub use builder::{Capsule, RegistryFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Install a test-friendly subscriber once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
