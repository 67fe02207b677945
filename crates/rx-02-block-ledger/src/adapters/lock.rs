//! # Data Directory Locking
//!
//! The ledger assumes a single writer per data directory: two processes
//! issuing from the same blocks would each advance their own in-memory
//! cursor and overwrite each other's full-replacement writes.
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from data directory locking.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created.
    #[error("Failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    /// Another process holds the lock.
    #[error("Ledger already in use{} ({})", pid.map(|p| format!(" by process {}", p)).unwrap_or_default(), path.display())]
    AlreadyLocked {
        /// PID recorded by the holder, if readable.
        pid: Option<u32>,
        /// Lock file path.
        path: PathBuf,
    },

    /// PID could not be written to the lock file.
    #[error("Failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Exclusive lock on a ledger data directory.
///
/// Acquired at startup, released on drop.
pub struct DatabaseLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DatabaseLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire an exclusive lock on `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `LockError::AlreadyLocked` if another process holds the lock.
    pub fn acquire(data_dir: &Path) -> Result<Self, LockError> {
        std::fs::create_dir_all(data_dir).map_err(LockError::CreateFailed)?;
        let lock_path = data_dir.join(Self::LOCK_FILE);

        // No truncate before the lock is held: the holder's PID must stay readable.
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(LockError::CreateFailed)?;

        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked {
                pid: Self::read_existing_pid(&lock_path),
                path: lock_path,
            });
        }

        let pid = std::process::id();
        file.set_len(0).map_err(LockError::WriteFailed)?;
        writeln!(file, "{}", pid).map_err(LockError::WriteFailed)?;
        file.sync_all().map_err(LockError::WriteFailed)?;

        tracing::debug!("[rx-02] Acquired data lock {}", lock_path.display());

        Ok(Self {
            file,
            path: lock_path,
            pid,
        })
    }

    /// PID of the holding process.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}
