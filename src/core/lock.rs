//! Target tree lock
//!
//! A target tree and its ledger have exactly one writer. The lock makes a
//! second installer pointed at the same tree fail instead of interleaving
//! extractions and ledger appends.

use crate::core::error::InstallError;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::Path;

/// Lock file name inside the target tree
pub const LOCK_FILE_NAME: &str = ".portlibs.lock";

/// Acquire an exclusive lock on a target tree.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_tree_lock(tree: &Path) -> Result<TreeLock> {
    let lock_path = tree.join(LOCK_FILE_NAME);

    let lock_file = File::create(&lock_path)
        .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

    if lock_file.try_lock_exclusive().is_err() {
        return Err(InstallError::TargetLocked {
            tree: tree.to_path_buf(),
            lock: lock_path,
        }
        .into());
    }

    Ok(TreeLock { file: lock_file })
}

/// RAII guard for the tree lock - releases the lock when dropped.
///
/// The lock file itself stays. Unlinking it would let a waiter holding the
/// old inode and a newcomer locking a fresh file both think they own the tree.
#[derive(Debug)]
pub struct TreeLock {
    file: File,
}

impl Drop for TreeLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
