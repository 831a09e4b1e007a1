use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::Duration;

use crate::error::{HiveError, Result};

/// Advisory cross-process lock, released when dropped.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Acquire an exclusive lock on `path`, creating it if needed.
/// Retries with exponential backoff (1ms to 512ms, ~1s total) before failing.
pub fn acquire_lock(path: &Path) -> Result<LockGuard> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let mut delay = Duration::from_millis(1);
    let max_delay = Duration::from_millis(512);

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(LockGuard { file }),
            Err(_) if delay <= max_delay => {
                std::thread::sleep(delay);
                delay *= 2;
            }
            Err(_) => return Err(HiveError::Locked(path.display().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("agents.lock");

        let guard = acquire_lock(&lock_path).unwrap();
        let err = acquire_lock(&lock_path).unwrap_err();
        assert!(matches!(err, HiveError::Locked(_)));

        drop(guard);
        let _again = acquire_lock(&lock_path).unwrap();
    }

    #[test]
    fn acquire_waits_through_backoff_before_failing() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("held.lock");
        let _held = acquire_lock(&lock_path).unwrap();

        let start = std::time::Instant::now();
        assert!(acquire_lock(&lock_path).is_err());
        assert!(
            start.elapsed() >= Duration::from_millis(500),
            "expected retry backoff, but elapsed was {:?}",
            start.elapsed()
        );
    }
}
