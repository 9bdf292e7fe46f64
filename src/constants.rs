//! Global constants used throughout the CAPM codebase.
//!
//! File names, schema versions, sentinel markers and lock timing live here so
//! the scanner, manifest, tracker and installer agree on them.

use std::time::Duration;

/// Reserved frontmatter key holding capsule metadata.
pub const METADATA_KEY: &str = "capsule";

/// Build-output directory under the registry root. Never scanned.
pub const BUILD_DIR: &str = "build";

/// File name of the persisted manifest inside [`BUILD_DIR`].
pub const MANIFEST_FILE: &str = "manifest.json";

/// Schema version written into persisted manifests.
pub const MANIFEST_VERSION: u32 = 1;

/// Per-project state directory.
pub const STATE_DIR: &str = ".capm";

/// File name of the tracker inside [`STATE_DIR`].
pub const TRACKER_FILE: &str = "installed.json";

/// File name of the advisory lock inside [`STATE_DIR`].
pub const LOCK_FILE: &str = ".lock";

/// Schema version written into tracker files.
pub const TRACKER_VERSION: u32 = 1;

/// Opening marker of the managed region in a merge document.
pub const MERGE_BEGIN_MARKER: &str = "<!-- capm:begin -->";

/// Closing marker of the managed region in a merge document.
pub const MERGE_END_MARKER: &str = "<!-- capm:end -->";

/// Minimum number of words a description should have before it stops
/// triggering a warning.
pub const MIN_DESC_WORDS: usize = 3;

/// Name of the built-in target.
pub const DEFAULT_TARGET_NAME: &str = "claude";

/// Environment variable pointing at an alternate config file.
pub const CONFIG_ENV_VAR: &str = "CAPM_CONFIG";

/// Default timeout for acquiring the project lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum delay between lock attempts.
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// First delay between lock attempts.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;
