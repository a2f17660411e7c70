//! Launching the interactive editor on the plaintext temp file.
//!
//! The editor inherits the session's standard streams and runs to
//! completion; there is no cancellation path. The temp file path is always
//! appended as the final argument.

use crate::config::CommandSpec;
use crate::errors::{AppResult, EditorError};
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Runs the configured editor command with `temp_file` appended, blocking
/// until it exits.
///
/// # Errors
///
/// Returns an `EditorError` variant matching what went wrong: the command
/// was not found, could not be executed, or exited with a non-zero status.
pub fn run_editor(spec: &CommandSpec, temp_file: &Path) -> AppResult<()> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args).arg(temp_file);

    debug!(editor = %spec.program, "launching editor");

    match command.status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(EditorError::NonZeroExit {
            command: spec.program.clone(),
            status_code: status.code().unwrap_or(-1),
        }
        .into()),
        Err(source) => {
            let specific = match source.kind() {
                io::ErrorKind::NotFound => EditorError::CommandNotFound {
                    command: spec.program.clone(),
                    source,
                },
                io::ErrorKind::PermissionDenied => EditorError::PermissionDenied {
                    command: spec.program.clone(),
                    source,
                },
                _ => EditorError::ExecutionFailed {
                    command: spec.program.clone(),
                    source,
                },
            };

            Err(specific.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use tempfile::tempdir;

    #[test]
    fn test_missing_editor_is_command_not_found() {
        let dir = tempdir().unwrap();
        let spec = CommandSpec::new("agedit-test-no-such-editor");

        match run_editor(&spec, &dir.path().join("file")) {
            Err(AppError::Editor(EditorError::CommandNotFound { command, .. })) => {
                assert_eq!(command, "agedit-test-no-such-editor");
            }
            other => panic!("expected CommandNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_editor_run() {
        let dir = tempdir().unwrap();
        let spec = CommandSpec {
            program: "true".to_string(),
            args: Vec::new(),
        };

        run_editor(&spec, &dir.path().join("file")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_reports_status() {
        let dir = tempdir().unwrap();
        let spec = CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 7".to_string()],
        };

        match run_editor(&spec, &dir.path().join("file")) {
            Err(AppError::Editor(EditorError::NonZeroExit { status_code, .. })) => {
                assert_eq!(status_code, 7);
            }
            other => panic!("expected NonZeroExit, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_temp_file_is_final_argument() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("argv.txt");
        let spec = CommandSpec {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                format!("printf '%s' \"$1\" > {}", out.display()),
                "argv-check".to_string(),
            ],
        };
        let temp_file = dir.path().join("notes");

        run_editor(&spec, &temp_file).unwrap();

        let recorded = std::fs::read_to_string(&out).unwrap();
        assert_eq!(recorded, temp_file.display().to_string());
    }
}
