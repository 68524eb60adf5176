// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Advisory locking for the datastore directory.
//!
//! The block files assume exclusive ownership by one process; the lock
//! enforces it. A held lock is an error, not something to wait on —
//! two ReedFlow processes on one directory is a deployment mistake.

use crate::error::{FlowError, FlowResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive lock on a datastore directory (RAII).
///
/// Released when dropped.
#[derive(Debug)]
pub struct DirectoryLock {
    file: File,
}

/// Acquire the exclusive lock for `dir`.
///
/// ## Input
/// - `dir`: datastore directory (must exist)
///
/// ## Output
/// - `Ok(DirectoryLock)`: lock held until drop
/// - `Err(FlowError::LockFailed)`: another process holds it
/// - `Err(FlowError::IoError)`: lock file could not be created
pub fn acquire_lock(dir: &Path) -> FlowResult<DirectoryLock> {
    let lock_path = dir.join("flow.lock");

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| FlowError::IoError {
            operation: "create_lock_file".to_string(),
            reason: e.to_string(),
        })?;

    file.try_lock_exclusive().map_err(|e| FlowError::LockFailed {
        path: lock_path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(DirectoryLock { file })
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
