//! SIGUSR1 checkpoint saves, exercised against the built binary.
//!
//! A scripted editor writes a first phase, signals its parent (the agedit
//! process), and sleeps before writing a second phase. While it sleeps, the
//! encrypted file must already decrypt to the first phase.

#![cfg(unix)]


use agedit::crypto::decrypt_to_file;
use assert_cmd::cargo::CommandCargoExt;
use std::fs;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;
use test_helpers::{seal_bytes, write_editor_script, write_identity_file};

#[test]
fn test_sigusr1_triggers_checkpoint_save() {
    let dir = tempdir().unwrap();
    let prefix = dir.path().join("tmp");
    fs::create_dir(&prefix).unwrap();

    let (identities, identity) = write_identity_file(dir.path());
    let encrypted = seal_bytes(dir.path(), "notes.age", b"initial", &identity);

    let editor = write_editor_script(
        dir.path(),
        "phased-edit",
        r#"printf 'phase1' > "$1"
kill -USR1 $PPID
sleep 3
printf 'phase2' > "$1""#,
    );

    let mut agedit = Command::cargo_bin("agedit")
        .expect("agedit binary not built")
        .args(["--no-memlock", "--editor"])
        .arg(&editor)
        .arg("--temp-dir")
        .arg(&prefix)
        .arg(&identities)
        .arg(&encrypted)
        .spawn()
        .expect("failed to start agedit");

    // Poll the encrypted file for the checkpoint while the editor sleeps.
    let mut checkpoint_seen = false;
    for attempt in 0..60 {
        thread::sleep(Duration::from_millis(50));

        let restored = dir.path().join(format!("poll-{attempt}"));
        if decrypt_to_file(&encrypted, &restored, None, std::slice::from_ref(&identity)).is_ok()
            && fs::read(&restored).unwrap() == b"phase1"
        {
            checkpoint_seen = true;
            break;
        }
    }

    let status = agedit.wait().expect("failed to wait for agedit");

    assert!(
        checkpoint_seen,
        "did not observe the checkpoint save triggered by SIGUSR1"
    );
    assert!(status.success(), "agedit failed: {status:?}");

    // The final save reflects the editor's last write.
    let restored = dir.path().join("final");
    decrypt_to_file(&encrypted, &restored, None, std::slice::from_ref(&identity)).unwrap();
    assert_eq!(fs::read(&restored).unwrap(), b"phase2");
}
