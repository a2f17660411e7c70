/*!
# agedit

Agedit edits age-encrypted files with your text editor. It decrypts a file
into a hardened temporary workspace, launches the editor, and re-encrypts on
exit, but only when the content actually changed. While the editor runs,
SIGUSR1 triggers a checkpoint save without disturbing it.

## Core guarantees

- An advisory lock keeps two agedit sessions off the same encrypted file.
- The plaintext only ever lives in an owner-only directory, preferring a
  RAM-backed tmpfs, and is removed when the session ends.
- A failed save never silently destroys edits: the plaintext file survives
  and its path is reported for manual recovery.
- Process memory is locked against swapping before key material is loaded.

## Architecture

- `cli`: argument parsing and one-time resolution of environment defaults
- `config`: the immutable session configuration value
- `errors`: error taxonomy and the `AppResult` alias
- `identity`: identities-file parsing
- `crypto`: age encryption/decryption with armor detection and filters
- `checksum`: BLAKE3 change detection
- `workspace`: the per-session temp directory
- `lockfile`: the advisory file lock
- `signal`: the SIGUSR1 checkpoint trigger
- `editor`: spawning the interactive editor
- `session`: the state machine tying it all together
- `memlock`: process memory locking
*/

/// BLAKE3 change detection for the plaintext temp file
pub mod checksum;
/// Command-line interface and environment-default resolution
pub mod cli;
/// Immutable session configuration
pub mod config;
/// Age encryption and decryption with armor detection and filter commands
pub mod crypto;
/// Spawning the interactive editor
pub mod editor;
/// Error types and utilities for error handling
pub mod errors;
/// Identities-file parsing
pub mod identity;
/// Advisory locking of the encrypted file
pub mod lockfile;
/// Process memory locking
pub mod memlock;
/// The edit session state machine
pub mod session;
/// SIGUSR1 checkpoint trigger
pub mod signal;
/// Session-scoped temporary workspace
pub mod workspace;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::{CommandSpec, Config};
pub use errors::{AppError, AppResult};
pub use session::{run, SessionOutcome};
