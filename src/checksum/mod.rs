//! Change detection for the plaintext temp file.
//!
//! The session decides whether re-encryption is needed by comparing BLAKE3
//! digests of the temp file at two points in time. A missing file digests as
//! empty input, so "file didn't exist yet" and "file exists but is empty"
//! compare equal.

use crate::errors::AppResult;
use std::fs::File;
use std::io;
use std::path::Path;

/// Computes the BLAKE3 digest of a file's contents.
///
/// If the file does not exist, returns the digest of empty input.
pub fn checksum_file(path: &Path) -> AppResult<blake3::Hash> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(blake3::Hasher::new().finalize());
        }
        Err(err) => return Err(err.into()),
    };

    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;

    Ok(hasher.finalize())
}
