//! Filesystem and terminal helpers shared by the pipeline stages.
//!
//! - [`fs`] - atomic writes, directory creation, path containment checks
//! - [`progress`] - spinner shown by long-running CLI commands

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, ensure_parent_dir, is_safe_path, normalize_path};
pub use progress::{ProgressBar, spinner_with_message};
