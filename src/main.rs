/*!
Agedit binary entry point.

Coordinates the pieces around one edit session:

1. parse command-line arguments and resolve environment defaults;
2. initialize logging to stderr;
3. lock process memory (unless disabled) before any key material is read;
4. run the edit session;
5. report warnings (even when the session failed), and on a failed save give
   the user a chance to recover the plaintext before the workspace is
   deleted.

Exit codes: 0 on success, 1 on runtime failure, 2 on usage or configuration
errors (clap reports its own parse failures with 2 as well).
*/

use agedit::errors::AppError;
use agedit::{cli, memlock, session, workspace, CliArgs};
use clap::Parser;
use std::io::{self, BufRead};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

const EXIT_ERROR: u8 = 1;
const EXIT_BAD_USAGE: u8 = 2;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Logs go to stderr so they never mix with the editor's terminal output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = match cli::resolve(&args).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::from(EXIT_BAD_USAGE);
        }
    };

    // Must happen before identities are loaded so key material never lands
    // in swappable pages.
    if config.memlock {
        if let Err(err) = memlock::lock_memory() {
            eprintln!(
                "Error: {err}. You may need to increase the limit on locked memory. \
                 Pass --no-memlock to suppress this error."
            );
            return ExitCode::from(EXIT_ERROR);
        }
    }

    info!("starting agedit");

    let (outcome, result) = session::run(&config);

    // Warnings apply whether or not the session succeeded.
    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");

            if let AppError::Save(save_err) = &err {
                offer_recovery(&save_err.temp_file);
            }

            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// After a failed save the plaintext still holds the user's edits. Hold the
/// workspace until they confirm, then clean it up.
fn offer_recovery(temp_file: &std::path::Path) {
    eprintln!("Press <Enter> to delete temporary file {temp_file:?}");

    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);

    if let Some(dir) = temp_file.parent() {
        workspace::remove_workspace_dir(dir);
    }
}
