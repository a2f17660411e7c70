//! Error handling utilities for the agedit application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur during an edit session, as well
//! as the convenience type alias `AppResult` for functions that can return
//! these errors.
//!
//! The taxonomy mirrors the session state machine: each phase that can fail
//! terminally has its own error type, and `AppError` wraps them all. Every
//! error up to and including `EditorError` triggers full teardown before it
//! is surfaced; `SaveError` alone suppresses workspace removal so unsaved
//! edits stay recoverable.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the initial access check on the encrypted file.
///
/// The check runs before anything is decrypted, so that a session never
/// fails with unsaved edits merely because the encrypted file turned out to
/// be unwritable.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The encrypted file does not exist and the session is read-only, so
    /// there is nothing to show and nothing may be created.
    #[error("{path:?} does not exist; won't attempt to create it in read-only mode")]
    MissingReadOnly {
        /// The encrypted file path that was not found
        path: PathBuf,
    },

    /// The encrypted file exists but cannot be opened for reading.
    #[error("can't read from file {path:?}: {source}")]
    Unreadable {
        /// The encrypted file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The encrypted file exists but cannot be opened for writing, which a
    /// non-read-only session will need at save time.
    #[error("can't write to file {path:?}: {source}")]
    Unwritable {
        /// The encrypted file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Errors from loading and parsing the identities file.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identities file could not be read at all.
    #[error("failed to read identities file {path:?}: {source}")]
    Unreadable {
        /// The identities file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A non-comment line failed to parse as an age X25519 identity.
    ///
    /// The position counts non-comment, non-blank lines only, starting at 1,
    /// so the user can find the offending key without counting comments.
    #[error("failed to parse private key number {position}: {reason}")]
    ParseFailed {
        /// 1-based position among non-comment lines
        position: usize,
        /// Parser diagnostic from the age crate
        reason: String,
    },

    /// The file contained no identities after filtering comments and blanks.
    #[error("no identities found in file")]
    NoIdentities,
}

/// Errors from allocating the session workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The workspace directory tree could not be created.
    #[error("failed to create workspace directory {path:?}: {source}")]
    Create {
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Workspace permissions could not be restricted to the owner.
    #[error("failed to set permissions on {path:?}: {source}")]
    Permissions {
        /// The path whose permissions could not be changed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Errors from the advisory lock on the encrypted file.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another cooperating session already holds the lock.
    #[error("encrypted file is locked by another session: {path}. Wait for the other editor to close or pass --no-lock.")]
    FileBusy {
        /// The path to the file that is locked
        path: PathBuf,
    },

    /// Acquiring the lock failed for a technical reason.
    #[error("failed to acquire lock on {path}: {source}")]
    AcquisitionFailed {
        /// The path to the file that couldn't be locked
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Errors from cryptographic operations.
///
/// Decryption and encryption are fail-fast: any of these aborts the whole
/// operation and leaves the destination file unusable by contract.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The start of the encrypted stream could not be read.
    #[error("failed to read header: {0}")]
    HeaderRead(#[source] io::Error),

    /// The input is encrypted to a passphrase, which the identities-file
    /// workflow cannot supply.
    #[error("file is passphrase-encrypted; agedit only supports identity-based encryption")]
    UnsupportedFormat,

    /// Re-encryption was requested for an empty recipient set.
    #[error("cannot encrypt to zero recipients")]
    NoRecipients,

    /// No supplied identity could decrypt the file, or the stream is
    /// malformed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(#[source] age::DecryptError),

    /// Error during the encryption operation.
    #[error("encryption failed: {0}")]
    EncryptionFailed(#[source] age::EncryptError),
}

impl From<age::DecryptError> for CryptoError {
    fn from(err: age::DecryptError) -> Self {
        CryptoError::DecryptionFailed(err)
    }
}

impl From<age::EncryptError> for CryptoError {
    fn from(err: age::EncryptError) -> Self {
        CryptoError::EncryptionFailed(err)
    }
}

/// Errors from an external encode/decode filter command.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter process could not be started.
    #[error("failed to start filter '{program}': {source}")]
    Spawn {
        /// The filter program name
        program: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Piping data through the filter failed.
    #[error("I/O error while running filter '{program}': {source}")]
    Io {
        /// The filter program name
        program: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The filter ran but exited with a non-zero status.
    #[error("filter '{program}' exited with status code {status_code}")]
    NonZeroExit {
        /// The filter program name
        program: String,
        /// The exit status code, or -1 if terminated by a signal
        status_code: i32,
    },
}

/// Represents specific error cases that can occur when interacting with the
/// external editor.
///
/// Each variant captures the editor command and, where available, the
/// underlying I/O error, so messages can point at the actual misconfiguration.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The editor command cannot be found.
    #[error("editor command '{command}' not found: {source}. Check that the editor is installed and on your PATH.")]
    CommandNotFound {
        /// The editor command that was not found
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Permission was denied when executing the editor command.
    #[error("permission denied when executing editor '{command}': {source}")]
    PermissionDenied {
        /// The editor command that had permission denied
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The editor command failed to execute due to another I/O error.
    #[error("failed to execute editor '{command}': {source}")]
    ExecutionFailed {
        /// The editor command that failed to execute
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The editor exited with a non-zero status code.
    #[error("editor '{command}' exited with status code {status_code}")]
    NonZeroExit {
        /// The editor command that exited with a non-zero status
        command: String,
        /// The exit status code, or -1 if terminated by a signal
        status_code: i32,
    },
}

/// A save (checkpoint or final) failed after the user may have edited the
/// plaintext.
///
/// This error carries the temp file path and, uniquely in the taxonomy,
/// suppresses automatic workspace removal: the caller is expected to offer
/// the user a chance to recover the file before cleaning up.
#[derive(Debug, Error)]
#[error("encryption failed: {source}")]
pub struct SaveError {
    /// The plaintext temp file holding the unsaved edits
    pub temp_file: PathBuf,
    /// What went wrong during the save
    #[source]
    pub source: Box<AppError>,
}

/// Represents all possible errors that can occur in the agedit application.
///
/// This enum is the central error type used across the application, with one
/// variant per failure category. It uses `thiserror` for deriving the `Error`
/// trait implementation and formatted error messages.
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration resolution or validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encrypted file failed the up-front access check.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The identities file could not be loaded or parsed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The session workspace could not be allocated.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// The advisory lock could not be acquired.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A cryptographic operation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// An external encode/decode filter failed.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The editor subprocess failed to launch or exited abnormally.
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// The final save failed; unsaved edits remain in the temp file.
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_app_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();

        match app_error {
            AppError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            _ => panic!("Expected AppError::Io variant"),
        }
    }

    #[test]
    fn test_identity_error_reports_position() {
        let error = IdentityError::ParseFailed {
            position: 3,
            reason: "invalid Bech32 encoding".to_string(),
        };
        let message = format!("{}", error);
        assert!(message.contains("number 3"));
        assert!(message.contains("Bech32"));
    }

    #[test]
    fn test_lock_error_display() {
        let error = LockError::FileBusy {
            path: PathBuf::from("/vault/notes.age"),
        };
        let message = format!("{}", error);
        assert!(message.contains("locked"));
        assert!(message.contains("/vault/notes.age"));

        let error = LockError::AcquisitionFailed {
            path: PathBuf::from("/vault/notes.age"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(format!("{}", error).contains("permission denied"));
    }

    #[test]
    fn test_editor_error_variants() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "command not found");
        let error = EditorError::CommandNotFound {
            command: "vi".to_string(),
            source: io_error,
        };
        assert!(format!("{}", error).contains("not found"));
        assert!(format!("{}", error).contains("vi"));

        let error = EditorError::NonZeroExit {
            command: "vi".to_string(),
            status_code: 1,
        };
        assert!(format!("{}", error).contains("status code 1"));
    }

    #[test]
    fn test_save_error_carries_temp_file_and_source() {
        let inner = AppError::Crypto(CryptoError::NoRecipients);
        let save_error = SaveError {
            temp_file: PathBuf::from("/dev/shm/agedit-u@h/abc/notes"),
            source: Box::new(inner),
        };

        assert_eq!(
            save_error.temp_file,
            PathBuf::from("/dev/shm/agedit-u@h/abc/notes")
        );
        assert!(format!("{}", save_error).contains("encryption failed"));

        // The chain must reach the crypto error underneath.
        let source = save_error.source().expect("SaveError should have a source");
        assert!(source.to_string().contains("zero recipients"));
    }

    #[test]
    fn test_app_error_source_chaining() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let lock_error = LockError::AcquisitionFailed {
            path: PathBuf::from("/vault/notes.age"),
            source: io_error,
        };
        let app_error = AppError::Lock(lock_error);

        let first = app_error.source().expect("AppError::Lock should chain");
        let second = first.source().expect("LockError should chain to io::Error");
        let io_source = second
            .downcast_ref::<io::Error>()
            .expect("source should be an io::Error");
        assert_eq!(io_source.kind(), io::ErrorKind::PermissionDenied);
    }
}
