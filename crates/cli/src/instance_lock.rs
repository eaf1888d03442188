//! Single-instance guard
//!
//! Two monitors against the same configuration would dispatch every rescan
//! twice, so the process holds an exclusive lock on a well-known file for its
//! whole lifetime.

use anyhow::{anyhow, Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// RAII guard for the instance lock
///
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock without waiting; fails if another process holds it
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create lock directory {}", dir.display()))?;
        }

        // No truncate before locking: the running instance's pid must survive a failed attempt
        let mut file = File::options()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        file.try_lock_exclusive().map_err(|e| {
            anyhow!(
                "Another instance is already running (lock held on {}): {e}",
                path.display()
            )
        })?;

        file.set_len(0)
            .and_then(|()| writeln!(file, "{}", std::process::id()))
            .with_context(|| format!("Failed to write pid to {}", path.display()))?;

        debug!("Acquired instance lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Best effort unlock - log but don't panic if it fails
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            warn!("Failed to release instance lock {}: {e}", self.path.display());
        }
    }
}
