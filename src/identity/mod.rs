//! Loading age identities from an identities file.
//!
//! An identities file is UTF-8 text with one X25519 private key per line.
//! Blank lines and lines whose first non-whitespace character is `#` are
//! ignored, so the files produced by `age-keygen` load as-is.

use crate::errors::{AppResult, IdentityError};
use age::x25519::{Identity, Recipient};
use std::fs;
use std::path::Path;
use zeroize::Zeroize;

/// Parses an identities file into parallel identity and recipient vectors.
///
/// Every identity in the file becomes a recipient for re-encryption, so the
/// set of keys able to decrypt the file is preserved or widened, never
/// silently narrowed.
///
/// The raw file contents are zeroized after parsing; the parsed identities
/// themselves keep their key material in types the age crate manages.
///
/// # Errors
///
/// Returns `IdentityError::Unreadable` if the file cannot be read,
/// `IdentityError::ParseFailed` (with the 1-based position among non-comment
/// lines) if a line is not a valid X25519 identity, and
/// `IdentityError::NoIdentities` if nothing remains after filtering.
pub fn load_identities(path: &Path) -> AppResult<(Vec<Identity>, Vec<Recipient>)> {
    let mut contents = fs::read_to_string(path).map_err(|source| IdentityError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = parse_identities(&contents);
    contents.zeroize();

    let identities = parsed?;
    let recipients = identities.iter().map(Identity::to_public).collect();

    Ok((identities, recipients))
}

fn parse_identities(contents: &str) -> Result<Vec<Identity>, IdentityError> {
    let mut identities = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let position = identities.len() + 1;
        let identity = line
            .parse::<Identity>()
            .map_err(|reason| IdentityError::ParseFailed {
                position,
                reason: reason.to_string(),
            })?;

        identities.push(identity);
    }

    if identities.is_empty() {
        return Err(IdentityError::NoIdentities);
    }

    Ok(identities)
}
