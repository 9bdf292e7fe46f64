//! Project-level file locking for cross-process coordination.
//!
//! A real install or uninstall holds an exclusive advisory lock on
//! `.capm/.lock` for the whole load-mutate-save of the tracker, so two
//! concurrent invocations against one project cannot lose each other's
//! updates. The lock is released when the guard is dropped.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{
    DEFAULT_LOCK_TIMEOUT, LOCK_FILE, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, STATE_DIR,
};
use crate::core::CapmError;
use crate::utils::fs::ensure_dir;

/// Exclusive lock on one project's state directory.
#[derive(Debug)]
pub struct ProjectLock {
    _file: File,
    path: PathBuf,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Project lock released");
    }
}

impl ProjectLock {
    /// Acquire the lock, waiting up to the default timeout.
    pub fn acquire(project_dir: &Path) -> Result<Self> {
        Self::acquire_with_timeout(project_dir, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire the lock, retrying with exponential backoff until `timeout`.
    pub fn acquire_with_timeout(project_dir: &Path, timeout: Duration) -> Result<Self> {
        let state_dir = project_dir.join(STATE_DIR);
        ensure_dir(&state_dir)?;
        let path = state_dir.join(LOCK_FILE);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        let start = Instant::now();
        // 10ms, then growing, capped at 500ms
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            if let Ok(true) = file.try_lock_exclusive() {
                debug!(
                    path = %path.display(),
                    wait_ms = start.elapsed().as_millis(),
                    "Project lock acquired"
                );
                return Ok(Self {
                    _file: file,
                    path,
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(delay.min(remaining));
        }

        Err(CapmError::LockTimeout {
            path: path.display().to_string(),
            timeout_secs: timeout.as_secs(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_acquire_and_release() {
        let temp = TempDir::new().unwrap();
        {
            let _lock = ProjectLock::acquire(temp.path()).unwrap();
            assert!(temp.path().join(".capm/.lock").exists());
        }
        // Released on drop, so it can be taken again
        let _again = ProjectLock::acquire(temp.path()).unwrap();
    }

    #[test]
    fn test_lock_times_out_while_held() {
        let temp = TempDir::new().unwrap();
        let _held = ProjectLock::acquire(temp.path()).unwrap();

        let err = ProjectLock::acquire_with_timeout(temp.path(), Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err.downcast_ref::<CapmError>(), Some(CapmError::LockTimeout { .. })));
    }
}
