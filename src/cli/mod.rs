//! Command-line interface and configuration resolution.
//!
//! The CLI layer owns every ambient input: flags, `AGEDIT_*` environment
//! defaults, the editor fallback chain, and the `user@host` tag. It resolves
//! all of them exactly once into an immutable [`Config`]; the session core
//! never touches the environment.

use crate::config::{self, CommandSpec, Config};
use crate::errors::{AppError, AppResult};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const IDENTITIES_FILE_ENV: &str = "AGEDIT_IDENTITIES_FILE";
const ENCRYPTED_FILE_ENV: &str = "AGEDIT_ENCRYPTED_FILE";
const ARMOR_ENV: &str = "AGEDIT_ARMOR";
const COMMAND_ENV: &str = "AGEDIT_COMMAND";
const DECODE_ENV: &str = "AGEDIT_DECODE";
const ENCODE_ENV: &str = "AGEDIT_ENCODE";
const FORCE_ENV: &str = "AGEDIT_FORCE";
const LOCK_ENV: &str = "AGEDIT_LOCK";
const MEMLOCK_ENV: &str = "AGEDIT_MEMLOCK";
const READ_ONLY_ENV: &str = "AGEDIT_READ_ONLY";
const TEMP_DIR_ENV: &str = "AGEDIT_TEMP_DIR";
const WARN_ENV: &str = "AGEDIT_WARN";

/// Editor environment variables, in order of precedence.
const EDITOR_ENV_VARS: &[&str] = &["AGEDIT_EDITOR", "VISUAL", "EDITOR"];

const FALLBACK_EDITOR: &str = "vi";

/// Edit age-encrypted files with your text editor
#[derive(Parser, Debug)]
#[clap(name = "agedit", about = "Edit age-encrypted files with your text editor")]
#[clap(author, version, long_about = None)]
pub struct CliArgs {
    /// Identities file path (AGEDIT_IDENTITIES_FILE)
    #[clap(value_name = "IDENTITIES")]
    pub identities: Option<PathBuf>,

    /// Encrypted file path (AGEDIT_ENCRYPTED_FILE)
    #[clap(value_name = "ENCRYPTED")]
    pub encrypted: Option<PathBuf>,

    /// Write an armored age file (AGEDIT_ARMOR)
    #[clap(short = 'a', long)]
    pub armor: bool,

    /// Editor command with arguments; overrides --editor (AGEDIT_COMMAND)
    #[clap(short = 'c', long)]
    pub command: Option<String>,

    /// Filter command applied after decryption, like a decompressor (AGEDIT_DECODE)
    #[clap(long)]
    pub decode: Option<String>,

    /// Editor executable (AGEDIT_EDITOR, VISUAL, EDITOR)
    #[clap(short = 'e', long)]
    pub editor: Option<String>,

    /// Filter command applied before encryption, like a compressor (AGEDIT_ENCODE)
    #[clap(long)]
    pub encode: Option<String>,

    /// Re-encrypt on exit even if the content is unchanged (AGEDIT_FORCE)
    #[clap(short = 'f', long)]
    pub force: bool,

    /// Do not lock the encrypted file (negates AGEDIT_LOCK)
    #[clap(short = 'L', long)]
    pub no_lock: bool,

    /// Disable mlockall(2), which prevents swapping (negates AGEDIT_MEMLOCK)
    #[clap(short = 'M', long)]
    pub no_memlock: bool,

    /// Make the temporary file read-only and discard all changes (AGEDIT_READ_ONLY)
    #[clap(short = 'r', long)]
    pub read_only: bool,

    /// Temporary directory prefix (AGEDIT_TEMP_DIR)
    #[clap(short = 't', long)]
    pub temp_dir: Option<PathBuf>,

    /// Warn if the editor exits after less than this many seconds, 0 to disable (AGEDIT_WARN)
    #[clap(short = 'w', long)]
    pub warn: Option<u64>,
}

/// Resolves parsed arguments and environment defaults into a [`Config`].
///
/// # Errors
///
/// Returns `AppError::Config` for anything a user can get wrong here:
/// missing file paths, malformed boolean or integer environment values,
/// unsplittable command strings. Callers should treat these as usage errors.
pub fn resolve(args: &CliArgs) -> AppResult<Config> {
    // A single positional is the encrypted file; with two, the identities
    // file comes first.
    let (identities_arg, encrypted_arg) = match (&args.identities, &args.encrypted) {
        (Some(only), None) => (None, Some(only.clone())),
        (identities, encrypted) => (identities.clone(), encrypted.clone()),
    };

    let identities_path = identities_arg
        .or_else(|| env_path(IDENTITIES_FILE_ENV))
        .ok_or_else(|| missing_paths_error())?;
    let encrypted_path = encrypted_arg
        .or_else(|| env_path(ENCRYPTED_FILE_ENV))
        .ok_or_else(|| missing_paths_error())?;

    let armor = args.armor || env_bool(ARMOR_ENV, false)?;
    let lock = !args.no_lock && env_bool(LOCK_ENV, true)?;
    let memlock = !args.no_memlock && env_bool(MEMLOCK_ENV, true)?;
    let read_only = args.read_only || env_bool(READ_ONLY_ENV, false)?;
    let force = args.force || env_bool(FORCE_ENV, false)?;

    let editor = match args.command.clone().or_else(|| env_string(COMMAND_ENV)) {
        Some(command_line) => CommandSpec::parse(&command_line)?,
        None => CommandSpec::new(
            args.editor
                .clone()
                .or_else(editor_from_env)
                .unwrap_or_else(|| FALLBACK_EDITOR.to_string()),
        ),
    };

    let decode = args
        .decode
        .clone()
        .or_else(|| env_string(DECODE_ENV))
        .map(|line| CommandSpec::parse(&line))
        .transpose()?;
    let encode = args
        .encode
        .clone()
        .or_else(|| env_string(ENCODE_ENV))
        .map(|line| CommandSpec::parse(&line))
        .transpose()?;

    let temp_dir_prefix = match args.temp_dir.clone().or_else(|| env_path(TEMP_DIR_ENV)) {
        Some(prefix) => expand_prefix(&prefix),
        None => config::default_temp_dir_prefix(),
    };

    let warn_secs = match args.warn {
        Some(secs) => secs,
        None => env_u64(WARN_ENV, 0)?,
    };
    let warn_after = (warn_secs > 0).then(|| Duration::from_secs(warn_secs));

    Ok(Config {
        identities_path,
        encrypted_path,
        temp_dir_prefix,
        user_tag: user_tag()?,
        armor,
        lock,
        memlock,
        read_only,
        force,
        editor,
        decode,
        encode,
        warn_after,
    })
}

fn missing_paths_error() -> AppError {
    AppError::Config("need an identities file and an encrypted file".to_string())
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}

/// Parses a boolean setting. Accepts `1`, `true`, `yes` and `0`, `false`,
/// `no`, case-insensitively.
fn parse_bool(value: &str, name: &str) -> AppResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AppError::Config(format!(
            "invalid boolean value for {name}: {value:?}"
        ))),
    }
}

fn env_bool(name: &str, fallback: bool) -> AppResult<bool> {
    match env_string(name) {
        Some(value) => parse_bool(&value, name),
        None => Ok(fallback),
    }
}

fn env_u64(name: &str, fallback: u64) -> AppResult<u64> {
    match env_string(name) {
        Some(value) => value.parse().map_err(|_| {
            AppError::Config(format!("invalid integer value for {name}: {value:?}"))
        }),
        None => Ok(fallback),
    }
}

fn editor_from_env() -> Option<String> {
    EDITOR_ENV_VARS.iter().find_map(|var| env_string(var))
}

fn expand_prefix(prefix: &std::path::Path) -> PathBuf {
    let raw = prefix.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

fn user_tag() -> AppResult<String> {
    let host = whoami::fallible::hostname()
        .map_err(|err| AppError::Config(format!("failed to determine hostname: {err}")))?;
    Ok(format!("{}@{}", whoami::username(), host))
}
