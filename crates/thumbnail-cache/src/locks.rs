//! Per-artifact mutual exclusion
//!
//! [`LockRegistry`] hands out one async mutex per thumbnail path, created on first use.
//! Entries are never removed: memory grows by one small handle per distinct artifact
//! ever requested, which is bounded by the size of the media tree. A swept or
//! reference-counted variant would be needed to serve an unbounded key space.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard proving exclusive access to one artifact; released on drop
pub type ArtifactGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the handle for `key`, creating it if absent.
    ///
    /// Lookup and insertion happen under one lock, so concurrent callers with the same
    /// key always receive the same handle.
    pub fn handle(&self, key: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(handle) = locks.get(key) {
            return Arc::clone(handle);
        }
        let handle = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_path_buf(), Arc::clone(&handle));
        handle
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &Path) -> ArtifactGuard {
        self.handle(key).lock_owned().await
    }

    /// Number of distinct keys ever seen
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry")
            .field("entries", &self.len())
            .finish()
    }
}
