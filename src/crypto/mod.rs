//! Encryption and decryption of the edited file.
//!
//! Both directions stream through the age crate. Input files may be raw
//! binary age containers or ASCII-armored; the armor layer is auto-detected
//! by peeking the fixed begin marker without consuming the stream. Optional
//! external filter commands transform the plaintext on the way in and out
//! (e.g. a compressor pair).
//!
//! Operations are fail-fast and non-resumable: any filter or cryptographic
//! error aborts the whole operation, and a partially-written destination
//! file must not be treated as valid.

use crate::config::CommandSpec;
use crate::errors::{AppResult, CryptoError, FilterError};
use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::x25519::{Identity, Recipient};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// The marker an ASCII-armored age file starts with.
const ARMOR_HEADER: &[u8] = b"-----BEGIN AGE ENCRYPTED FILE-----";

/// Decrypts `input_path` to `output_path`, optionally piping the plaintext
/// through a decode filter command (e.g. a decompressor).
///
/// Armoring is detected by peeking exactly the marker length and
/// reconstructing the stream from the peeked bytes plus the remainder, so
/// detection works on non-seekable input too. Decryption succeeds if any one
/// of `identities` matches. The output file is created with mode 0600 on
/// Unix.
pub fn decrypt_to_file(
    input_path: &Path,
    output_path: &Path,
    decode: Option<&CommandSpec>,
    identities: &[Identity],
) -> AppResult<()> {
    let input = File::open(input_path)?;
    let mut reader = BufReader::new(input);

    let mut header = [0u8; ARMOR_HEADER.len()];
    let peeked = read_header(&mut reader, &mut header)?;
    let armored = &header[..peeked] == ARMOR_HEADER;
    debug!(armored, input = %input_path.display(), "decrypting");

    let chained = Cursor::new(header[..peeked].to_vec()).chain(reader);

    let mut plaintext: Box<dyn Read + Send> = if armored {
        Box::new(decrypt_stream(ArmoredReader::new(chained), identities)?)
    } else {
        Box::new(decrypt_stream(chained, identities)?)
    };

    let mut output = create_private_file(output_path)?;
    run_filter(decode, &mut plaintext, &mut output)?;
    output.flush()?;

    Ok(())
}

/// Encrypts `input_path` to `output_path` for all `recipients`, optionally
/// piping the plaintext through an encode filter command first and
/// optionally armoring the ciphertext.
pub fn encrypt_to_file(
    input_path: &Path,
    output_path: &Path,
    armored: bool,
    encode: Option<&CommandSpec>,
    recipients: &[Recipient],
) -> AppResult<()> {
    let mut input = File::open(input_path)?;
    let output = File::create(output_path)?;
    debug!(armored, output = %output_path.display(), "encrypting");

    if armored {
        let armor = ArmoredWriter::wrap_output(output, Format::AsciiArmor)?;
        let armor = encrypt_stream(armor, &mut input, encode, recipients)?;
        armor.finish()?.flush()?;
    } else {
        encrypt_stream(output, &mut input, encode, recipients)?.flush()?;
    }

    Ok(())
}

fn decrypt_stream<R: Read>(
    reader: R,
    identities: &[Identity],
) -> Result<age::stream::StreamReader<R>, CryptoError> {
    let decryptor = match age::Decryptor::new(reader)? {
        age::Decryptor::Recipients(decryptor) => decryptor,
        age::Decryptor::Passphrase(_) => return Err(CryptoError::UnsupportedFormat),
    };

    Ok(decryptor.decrypt(identities.iter().map(|identity| identity as &dyn age::Identity))?)
}

fn encrypt_stream<W: Write>(
    writer: W,
    input: &mut (dyn Read + Send),
    encode: Option<&CommandSpec>,
    recipients: &[Recipient],
) -> AppResult<W> {
    let boxed: Vec<Box<dyn age::Recipient + Send>> = recipients
        .iter()
        .map(|recipient| Box::new(recipient.clone()) as Box<dyn age::Recipient + Send>)
        .collect();

    let encryptor = age::Encryptor::with_recipients(boxed).ok_or(CryptoError::NoRecipients)?;
    let mut sealed = encryptor
        .wrap_output(writer)
        .map_err(CryptoError::EncryptionFailed)?;

    run_filter(encode, input, &mut sealed)?;

    Ok(sealed.finish()?)
}

/// Reads up to `buf.len()` bytes, stopping early only at end of input.
///
/// A short read at EOF is fine (the file may be smaller than the armor
/// marker); any other read failure is a header error.
fn read_header(reader: &mut dyn Read, buf: &mut [u8]) -> Result<usize, CryptoError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(CryptoError::HeaderRead(err)),
        }
    }
    Ok(filled)
}

/// Pipes `input` to `output`, through `filter`'s stdin/stdout if one is
/// configured, directly otherwise.
///
/// The filter inherits stderr so its diagnostics reach the terminal. A
/// non-zero filter exit aborts the enclosing operation.
fn run_filter(
    filter: Option<&CommandSpec>,
    input: &mut (dyn Read + Send),
    output: &mut dyn Write,
) -> AppResult<()> {
    let Some(spec) = filter else {
        io::copy(input, output)?;
        return Ok(());
    };

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| FilterError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

    let (Some(mut stdin), Some(mut stdout)) = (child.stdin.take(), child.stdout.take()) else {
        return Err(FilterError::Io {
            program: spec.program.clone(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "filter pipes unavailable"),
        }
        .into());
    };

    let (read_result, write_result) = thread::scope(|scope| {
        let writer = scope.spawn(move || -> io::Result<()> {
            match io::copy(input, &mut stdin) {
                Ok(_) => Ok(()),
                // The filter may legitimately stop reading early.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                Err(err) => Err(err),
            }
            // stdin drops here, closing the pipe so the filter sees EOF.
        });

        let read_result = io::copy(&mut stdout, output);
        let write_result = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("filter writer thread panicked")));

        (read_result, write_result)
    });

    let status = child.wait().map_err(|source| FilterError::Io {
        program: spec.program.clone(),
        source,
    })?;

    read_result.map_err(|source| FilterError::Io {
        program: spec.program.clone(),
        source,
    })?;
    write_result.map_err(|source| FilterError::Io {
        program: spec.program.clone(),
        source,
    })?;

    if !status.success() {
        return Err(FilterError::NonZeroExit {
            program: spec.program.clone(),
            status_code: status.code().unwrap_or(-1),
        }
        .into());
    }

    Ok(())
}

fn create_private_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}
