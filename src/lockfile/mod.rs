//! Advisory locking for the encrypted file.
//!
//! The lock is cooperative: it keeps two agedit sessions from editing the
//! same file at once, but offers no protection against programs that don't
//! check for it. Acquisition is a single non-blocking attempt; retrying or
//! blocking could deadlock two sessions opened from the same shell.

use crate::errors::{AppResult, LockError};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A live advisory lock on the encrypted file.
///
/// The lock is released on `unlock` or when the handle is dropped, whichever
/// comes first; both are idempotent.
#[derive(Debug)]
pub struct FileLock {
    file: Option<File>,
    path: PathBuf,
}

impl FileLock {
    /// Makes one non-blocking attempt to lock `path` exclusively.
    ///
    /// # Errors
    ///
    /// Returns `LockError::FileBusy` if another session holds the lock and
    /// `LockError::AcquisitionFailed` if the file cannot be opened or the
    /// lock call itself fails.
    pub fn acquire(path: &Path) -> AppResult<Self> {
        let file = File::open(path).map_err(|source| LockError::AcquisitionFailed {
            path: path.to_path_buf(),
            source,
        })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "acquired advisory lock");
                Ok(Self {
                    file: Some(file),
                    path: path.to_path_buf(),
                })
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::FileBusy {
                    path: path.to_path_buf(),
                }
                .into())
            }
            Err(source) => Err(LockError::AcquisitionFailed {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }

    /// Releases the lock. Safe to call more than once.
    ///
    /// A failure to release is logged and otherwise ignored: the descriptor
    /// is dropped either way, and the OS releases flock locks on close.
    pub fn unlock(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = FileExt::unlock(&file) {
                warn!(path = %self.path.display(), error = %err, "failed to release lock");
            } else {
                debug!(path = %self.path.display(), "released advisory lock");
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.unlock();
    }
}
