//! Exclusive run lock
//!
//! The metadata cache and the work directory are shared, unlocked state.
//! Runs that touch them take an advisory lock on a file next to the cache
//! and fail fast if another run already holds it.

use crate::error::{DocfoldError, DocfoldResult};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held advisory lock; released when dropped
#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock at `path` without waiting
    pub async fn acquire(path: &Path) -> DocfoldResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DocfoldError::io(format!("creating lock directory {}", parent.display()), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| DocfoldError::io(format!("opening lock file {}", path.display()), e))?;

        match file.try_lock_exclusive() {
            Ok(true) => {
                debug!("Acquired run lock {}", path.display());
                Ok(Self {
                    _file: file,
                    path: path.to_path_buf(),
                })
            }
            Ok(false) => Err(DocfoldError::AlreadyRunning(path.to_path_buf())),
            Err(e) => Err(DocfoldError::io(
                format!("locking {}", path.display()),
                e,
            )),
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
