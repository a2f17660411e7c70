//! Best-effort pinning of process memory.
//!
//! Locking all current and future pages keeps decrypted content and private
//! keys from being swapped to disk. It must run before any identity material
//! is loaded, which is why `main` calls it ahead of the session.

use crate::errors::AppResult;

/// Asks the OS to lock all current and future memory pages of the process.
///
/// # Errors
///
/// Fails when the locked-memory limit (`RLIMIT_MEMLOCK`) is too low or the
/// process lacks the privilege. Callers that don't require the guarantee
/// should skip the call rather than ignore the error.
#[cfg(unix)]
pub fn lock_memory() -> AppResult<()> {
    use std::io;

    // SAFETY: mlockall only changes paging behavior of the calling process.
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        return Err(io::Error::new(err.kind(), format!("failed to lock memory: {err}")).into());
    }

    Ok(())
}

/// Memory locking is unavailable on this platform; reports success.
#[cfg(not(unix))]
pub fn lock_memory() -> AppResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_memory_returns() {
        // Either outcome is valid here: success, or a clean error when the
        // environment caps RLIMIT_MEMLOCK.
        match lock_memory() {
            Ok(()) => {}
            Err(err) => assert!(err.to_string().contains("lock memory")),
        }
    }
}
