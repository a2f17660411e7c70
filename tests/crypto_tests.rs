//! Round-trip properties of the crypto pipeline.
//!
//! For any identity/recipient pair and byte sequence, decrypting an
//! encryption must restore the original, with and without armoring and with
//! and without a no-op filter pair.


use agedit::config::CommandSpec;
use agedit::crypto::{decrypt_to_file, encrypt_to_file};
use std::fs;
use tempfile::tempdir;
use test_helpers::write_identity_file;

fn sample_payloads() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        b"Hello, world!\n".to_vec(),
        b"no trailing newline".to_vec(),
        (0u8..=255).collect(),
        vec![0u8; 64 * 1024 + 17],
    ]
}

#[test]
fn test_roundtrip_preserves_bytes() {
    let dir = tempdir().unwrap();
    let (_, identity) = write_identity_file(dir.path());

    for armored in [false, true] {
        for (index, payload) in sample_payloads().into_iter().enumerate() {
            let plain = dir.path().join(format!("plain-{index}"));
            let sealed = dir.path().join(format!("sealed-{index}.age"));
            let restored = dir.path().join(format!("restored-{index}"));
            fs::write(&plain, &payload).unwrap();

            encrypt_to_file(&plain, &sealed, armored, None, &[identity.to_public()]).unwrap();
            decrypt_to_file(&sealed, &restored, None, std::slice::from_ref(&identity)).unwrap();

            assert_eq!(
                fs::read(&restored).unwrap(),
                payload,
                "payload {index} (armored: {armored}) did not round-trip"
            );
        }
    }
}

#[test]
fn test_armor_detection_is_automatic() {
    let dir = tempdir().unwrap();
    let (_, identity) = write_identity_file(dir.path());

    let plain = dir.path().join("plain");
    fs::write(&plain, b"detect me").unwrap();

    // The decrypt side never gets told which format it is reading.
    for (name, armored) in [("binary.age", false), ("armored.age", true)] {
        let sealed = dir.path().join(name);
        let restored = dir.path().join(format!("{name}.out"));

        encrypt_to_file(&plain, &sealed, armored, None, &[identity.to_public()]).unwrap();
        decrypt_to_file(&sealed, &restored, None, std::slice::from_ref(&identity)).unwrap();

        assert_eq!(fs::read(&restored).unwrap(), b"detect me");
    }
}

#[cfg(unix)]
#[test]
fn test_roundtrip_with_noop_filter_pair() {
    let dir = tempdir().unwrap();
    let (_, identity) = write_identity_file(dir.path());
    let cat = CommandSpec::new("cat");

    for armored in [false, true] {
        let plain = dir.path().join("plain");
        let sealed = dir.path().join("sealed.age");
        let restored = dir.path().join("restored");
        fs::write(&plain, b"through the filters\n").unwrap();

        encrypt_to_file(&plain, &sealed, armored, Some(&cat), &[identity.to_public()]).unwrap();
        decrypt_to_file(
            &sealed,
            &restored,
            Some(&cat),
            std::slice::from_ref(&identity),
        )
        .unwrap();

        assert_eq!(fs::read(&restored).unwrap(), b"through the filters\n");
    }
}

#[cfg(unix)]
#[test]
fn test_roundtrip_with_compressor_pair() {
    let dir = tempdir().unwrap();
    let (_, identity) = write_identity_file(dir.path());

    // Same shape as a real compressor pair, without depending on one being
    // installed: the encode side strips newlines, the decode side restores
    // nothing (asymmetric transforms must survive the crypto layer intact).
    let encode = CommandSpec::parse("tr -d '\\n'").unwrap();

    let plain = dir.path().join("plain");
    let sealed = dir.path().join("sealed.age");
    let restored = dir.path().join("restored");
    fs::write(&plain, b"a\nb\nc\n").unwrap();

    encrypt_to_file(
        &plain,
        &sealed,
        false,
        Some(&encode),
        &[identity.to_public()],
    )
    .unwrap();
    decrypt_to_file(&sealed, &restored, None, std::slice::from_ref(&identity)).unwrap();

    assert_eq!(fs::read(&restored).unwrap(), b"abc");
}
