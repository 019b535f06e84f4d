/// Per-file mutual exclusion for read-modify-write edits.
///
/// Every rewrite of a managed configuration file holds the lock for that file
/// from the read until the rename, so concurrent requests cannot lose each
/// other's updates.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct FileLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive section for `path`
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = canonical_key(path).await;
        let entry = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key).or_default())
        };
        entry.lock_owned().await
    }

    /// Number of distinct files ever locked
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Canonical path of the parent joined with the file name.
///
/// The file itself may not exist yet, so only the directory is resolved.
async fn canonical_key(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            match tokio::fs::canonicalize(parent).await {
                Ok(dir) => dir.join(name),
                Err(_) => path.to_path_buf(),
            }
        }
        _ => path.to_path_buf(),
    }
}
