//! The edit session state machine.
//!
//! One synchronous control flow runs the session from access check to
//! teardown; the only concurrent activity is the SIGUSR1 listener, which
//! shares the mutex-guarded save routine with the final save. Sequence:
//!
//! 1. verify access to the encrypted file;
//! 2. load identities and derive recipients;
//! 3. allocate the workspace;
//! 4. take the advisory lock (locking enabled, not read-only, file exists);
//! 5. decrypt into the temp file (file exists);
//! 6. record the initial content digest;
//! 7. read-only: make the temp file owner-read-only;
//! 8. otherwise: arm the checkpoint trigger;
//! 9. run the editor to completion;
//! 10. disarm the trigger, then run the final save;
//! 11. tear down: the lock is released on every path, the workspace is
//!     removed on every path except a failed save, where the plaintext must
//!     survive for manual recovery.

use crate::checksum::checksum_file;
use crate::config::{CommandSpec, Config};
use crate::crypto;
use crate::editor;
use crate::errors::{AccessError, AppError, AppResult, SaveError};
use crate::identity;
use crate::lockfile::FileLock;
use crate::signal::SignalBridge;
use crate::workspace::Workspace;
use age::x25519::{Identity, Recipient};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

/// What a session reports back to the caller besides its result.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    /// Informational notes for the user, printed after the editor exits.
    pub warnings: Vec<String>,
}

/// Runs one complete edit session described by `config`.
///
/// The outcome is returned alongside the result rather than inside it, so
/// warnings reach the caller even when the session fails: a too-quick editor
/// exit is worth reporting whether or not the editor, or the save after it,
/// succeeded.
///
/// The error, if any, comes from the state machine. All errors have
/// triggered full teardown by the time they surface, except `AppError::Save`:
/// the workspace is then intentionally left on disk and the error names the
/// temp file.
pub fn run(config: &Config) -> (SessionOutcome, AppResult<()>) {
    let mut outcome = SessionOutcome::default();
    let result = run_session(config, &mut outcome);
    (outcome, result)
}

fn run_session(config: &Config, outcome: &mut SessionOutcome) -> AppResult<()> {
    let exists = check_access(&config.encrypted_path, config.read_only)?;
    let (identities, recipients) = identity::load_identities(&config.identities_path)?;

    let workspace = Workspace::create(
        &config.temp_dir_prefix,
        &config.user_tag,
        &config.encrypted_path,
    )?;

    let result = run_in_workspace(config, exists, &identities, recipients, &workspace, outcome);

    match &result {
        // Unsaved edits live in the temp file; removal is deferred to the
        // caller so the user can recover them first.
        Err(AppError::Save(_)) => {}
        _ => workspace.remove(),
    }

    result
}

fn run_in_workspace(
    config: &Config,
    exists: bool,
    identities: &[Identity],
    recipients: Vec<Recipient>,
    workspace: &Workspace,
    outcome: &mut SessionOutcome,
) -> AppResult<()> {
    let temp_file = workspace.temp_file();

    // Held for the rest of the session; Drop releases it on every early
    // return below.
    let mut lock = None;
    if exists && config.lock && !config.read_only {
        lock = Some(FileLock::acquire(&config.encrypted_path)?);
    }

    if exists {
        crypto::decrypt_to_file(
            &config.encrypted_path,
            temp_file,
            config.decode.as_ref(),
            identities,
        )?;
    }

    let initial = checksum_file(temp_file)?;

    if config.read_only {
        make_read_only(temp_file)?;
    }

    let saver = Arc::new(Saver {
        temp_file: temp_file.to_path_buf(),
        encrypted_path: config.encrypted_path.clone(),
        armored: config.armor,
        force: config.force,
        encode: config.encode.clone(),
        recipients,
        last_saved: Mutex::new(initial),
    });

    let bridge = if config.read_only {
        None
    } else {
        Some(arm_checkpoints(&saver)?)
    };

    info!(file = %config.encrypted_path.display(), "starting editor");
    let editor_started = Instant::now();
    let editor_result = editor::run_editor(&config.editor, temp_file);

    // Recorded before the error checks below: a too-quick exit is worth
    // reporting even when the editor failed or the save after it does.
    if let Some(threshold) = config.warn_after {
        if editor_started.elapsed() <= threshold {
            outcome.warnings.push(format!(
                "editor exited after less than {} second(s)",
                threshold.as_secs()
            ));
        }
    }

    // Disarm before anything else: after this point SIGUSR1 has no effect,
    // and the final save cannot overlap a checkpoint.
    if let Some(bridge) = bridge {
        bridge.disarm();
    }

    editor_result?;

    if !config.read_only {
        match saver.save() {
            Ok(true) => info!("changes saved"),
            Ok(false) => debug!("no changes to save"),
            Err(source) => {
                return Err(SaveError {
                    temp_file: temp_file.to_path_buf(),
                    source: Box::new(source),
                }
                .into());
            }
        }
    }

    if let Some(lock) = lock.as_mut() {
        lock.unlock();
    }

    Ok(())
}

/// Verifies the encrypted file is readable (and writable unless read-only)
/// without mutating it, before anything else happens.
///
/// Returns whether the file exists; a missing file is only permitted when
/// the session may create it, i.e. not in read-only mode.
fn check_access(path: &Path, read_only: bool) -> AppResult<bool> {
    match fs::metadata(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if read_only {
                return Err(AccessError::MissingReadOnly {
                    path: path.to_path_buf(),
                }
                .into());
            }
            return Ok(false);
        }
        Err(source) => {
            return Err(AccessError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
            .into());
        }
        Ok(_) => {}
    }

    File::open(path).map_err(|source| AccessError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    // Probe writability now; a save-time surprise would strand the user's
    // edits.
    if !read_only {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| AccessError::Unwritable {
                path: path.to_path_buf(),
                source,
            })?;
    }

    Ok(true)
}

/// The save routine shared by the checkpoint trigger and the final save.
///
/// The mutex serializes the digest-compare-then-encrypt sequence: two
/// interleaved runs could skip a needed save or corrupt the last-saved
/// digest.
struct Saver {
    temp_file: PathBuf,
    encrypted_path: PathBuf,
    armored: bool,
    force: bool,
    encode: Option<CommandSpec>,
    recipients: Vec<Recipient>,
    last_saved: Mutex<blake3::Hash>,
}

impl Saver {
    /// Re-encrypts the temp file if its digest changed since the last save
    /// (or unconditionally under `force`). Returns whether a save happened.
    fn save(&self) -> AppResult<bool> {
        let mut last_saved = self
            .last_saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = checksum_file(&self.temp_file)?;
        if !self.force && *last_saved == current {
            return Ok(false);
        }

        crypto::encrypt_to_file(
            &self.temp_file,
            &self.encrypted_path,
            self.armored,
            self.encode.as_ref(),
            &self.recipients,
        )?;
        *last_saved = current;

        Ok(true)
    }
}

fn arm_checkpoints(saver: &Arc<Saver>) -> AppResult<SignalBridge> {
    let saver = Arc::clone(saver);

    let bridge = SignalBridge::arm(move || match saver.save() {
        Ok(true) => debug!("checkpoint saved"),
        Ok(false) => debug!("checkpoint requested, no changes"),
        // Checkpoint failures never end the session. The leading \r and BEL
        // make the message visible over a full-screen editor.
        Err(err) => eprintln!("\r\x07agedit: saving failed: {err}"),
    })?;

    Ok(bridge)
}

#[cfg(unix)]
fn make_read_only(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o400))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_read_only(path: &Path) -> AppResult<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(true);
    fs::set_permissions(path, permissions)?;
    Ok(())
}
