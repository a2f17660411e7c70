//! Session-scoped temporary workspace for the plaintext file.
//!
//! Layout: `{prefix}/agedit-{user}@{host}/{random-id}/{rootname}`, where
//! `rootname` is the encrypted file's name with a trailing `.age` stripped.
//! The per-user namespace directory keeps sessions of different users apart
//! on shared prefixes like `/dev/shm`; the random subdirectory keeps
//! concurrent sessions of the same user apart.

use crate::errors::{AppResult, WorkspaceError};
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Length of the random workspace subdirectory name.
const RANDOM_ID_LENGTH: usize = 8;

/// Lowercase Crockford base32. 8 characters give 32^8 (2^40) possibilities,
/// enough that concurrent sessions of one user won't collide.
const RANDOM_ID_ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// The session's temporary directory and the plaintext file path inside it.
///
/// Owned exclusively by the session. Removal is explicit rather than `Drop`:
/// after a failed save the workspace is deliberately kept so the user can
/// recover unsaved edits.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    temp_file: PathBuf,
}

impl Workspace {
    /// Allocates a workspace under `prefix` for the given user tag and
    /// encrypted file.
    ///
    /// Both the namespace directory and the random subdirectory are created
    /// with owner-only permissions. The plaintext file itself is not created
    /// here; decryption (or the editor, for a new file) creates it.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError` if directory creation or permission
    /// hardening fails. Partially created directories are removed
    /// best-effort before the error is returned.
    pub fn create(prefix: &Path, user_tag: &str, encrypted_path: &Path) -> AppResult<Self> {
        let rootname = root_name(encrypted_path).ok_or_else(|| WorkspaceError::Create {
            path: encrypted_path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "encrypted file path has no usable file name",
            ),
        })?;

        let namespace = prefix.join(format!("agedit-{user_tag}"));
        let dir = namespace.join(random_id());

        fs::create_dir_all(&dir).map_err(|source| WorkspaceError::Create {
            path: dir.clone(),
            source,
        })?;

        for path in [namespace.as_path(), dir.as_path()] {
            if let Err(source) = restrict_to_owner(path) {
                remove_workspace_dir(&dir);
                return Err(WorkspaceError::Permissions {
                    path: path.to_path_buf(),
                    source,
                }
                .into());
            }
        }

        let temp_file = dir.join(rootname);
        debug!(dir = %dir.display(), "created workspace");

        Ok(Self { dir, temp_file })
    }

    /// The random session directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The plaintext temp file path inside the session directory.
    pub fn temp_file(&self) -> &Path {
        &self.temp_file
    }

    /// Removes the session directory and, if now empty, the per-user
    /// namespace directory above it. Never fails; cleanup problems beyond
    /// "already gone" are logged.
    pub fn remove(&self) {
        remove_workspace_dir(&self.dir);
    }
}

/// Removes a session directory tree and then its parent namespace directory
/// if that is empty. Missing paths are fine; other failures are logged.
pub fn remove_workspace_dir(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(dir = %dir.display(), "removed workspace"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(dir = %dir.display(), error = %err, "failed to remove workspace"),
    }

    // Only succeeds when no other session still owns a subdirectory.
    if let Some(namespace) = dir.parent() {
        let _ = fs::remove_dir(namespace);
    }
}

/// Strips a trailing `.age` from the file name of `path`.
///
/// Returns `None` when the path has no UTF-8 file name to work with.
pub fn root_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let root = name.strip_suffix(".age").unwrap_or(name);
    if root.is_empty() {
        return None;
    }
    Some(root.to_string())
}

fn random_id() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_ID_LENGTH)
        .map(|_| {
            let index = rng.gen_range(0..RANDOM_ID_ALPHABET.len());
            RANDOM_ID_ALPHABET[index] as char
        })
        .collect()
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> io::Result<()> {
    Ok(())
}
