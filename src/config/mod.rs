//! Session configuration.
//!
//! A `Config` is built exactly once by the CLI layer and handed to the
//! session by value. The core never re-reads configuration sources: every
//! environment-derived default (editor chain, boolean toggles, temp-dir
//! prefix, the `user@host` tag for the workspace namespace) is resolved
//! before the session starts.

use crate::errors::{AppError, AppResult};
use crate::workspace;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Filesystem locations checked for RAM-backed temporary storage.
///
/// Preferring tmpfs keeps decrypted content out of persistent storage
/// entirely on systems that mount one.
const TMPFS_PATHS: &[&str] = &["/dev/shm", "/run/shm"];

/// An external program plus its argument vector.
///
/// Used for the editor and for the optional encode/decode filters. The
/// program is never passed through a shell; arguments are already split.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The executable to run.
    pub program: String,
    /// Arguments passed before any path the caller appends.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// A command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Splits a shell-style command line into a program and arguments.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on unbalanced quoting or an empty command.
    pub fn parse(command_line: &str) -> AppResult<Self> {
        let words = shell_words::split(command_line)
            .map_err(|err| AppError::Config(format!("failed to split command: {err}")))?;

        let mut words = words.into_iter();
        let program = words
            .next()
            .ok_or_else(|| AppError::Config("empty command".to_string()))?;

        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Command lines can embed secrets (e.g. filter passphrases).
        f.write_str("[REDACTED_COMMAND]")
    }
}

/// Immutable description of one edit session.
pub struct Config {
    /// Path to the identities file.
    pub identities_path: PathBuf,

    /// Path to the encrypted file being edited.
    pub encrypted_path: PathBuf,

    /// Prefix under which the session workspace is allocated.
    pub temp_dir_prefix: PathBuf,

    /// `user@host`, resolved once by the CLI layer for the workspace
    /// namespace directory.
    pub user_tag: String,

    /// Write ASCII-armored output when re-encrypting.
    pub armor: bool,

    /// Take the advisory lock on the encrypted file.
    pub lock: bool,

    /// Lock process memory before loading identities.
    pub memlock: bool,

    /// Discard all changes; the temp file is made read-only.
    pub read_only: bool,

    /// Re-encrypt on save even if the content digest is unchanged.
    pub force: bool,

    /// The editor (or override command) to run on the temp file.
    pub editor: CommandSpec,

    /// Filter applied to plaintext after decryption (e.g. a decompressor).
    pub decode: Option<CommandSpec>,

    /// Filter applied to plaintext before encryption (e.g. a compressor).
    pub encode: Option<CommandSpec>,

    /// Warn if the editor exits within this duration.
    pub warn_after: Option<Duration>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("identities_path", &"[REDACTED_PATH]")
            .field("encrypted_path", &self.encrypted_path)
            .field("temp_dir_prefix", &self.temp_dir_prefix)
            .field("user_tag", &self.user_tag)
            .field("armor", &self.armor)
            .field("lock", &self.lock)
            .field("memlock", &self.memlock)
            .field("read_only", &self.read_only)
            .field("force", &self.force)
            .field("editor", &self.editor)
            .field("decode", &self.decode)
            .field("encode", &self.encode)
            .field("warn_after", &self.warn_after)
            .finish()
    }
}

impl Config {
    /// Checks invariants the CLI layer cannot express through types alone.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the editor command is empty or the
    /// encrypted path has no usable file name to derive the temp file name
    /// from.
    pub fn validate(&self) -> AppResult<()> {
        if self.editor.program.is_empty() {
            return Err(AppError::Config(
                "editor command cannot be empty".to_string(),
            ));
        }

        if workspace::root_name(&self.encrypted_path).is_none() {
            return Err(AppError::Config(format!(
                "encrypted file path has no usable file name: {}",
                self.encrypted_path.display()
            )));
        }

        Ok(())
    }
}

/// The default workspace prefix: a RAM-backed tmpfs when one is mounted,
/// otherwise the system temp directory.
pub fn default_temp_dir_prefix() -> PathBuf {
    if cfg!(unix) {
        for candidate in TMPFS_PATHS {
            let path = PathBuf::from(candidate);
            if path.is_dir() {
                return path;
            }
        }
    }

    env::temp_dir()
}
