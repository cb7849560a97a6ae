use crate::cache::store::{encode, write_replacing, CacheStore};
use crate::tree::Work;
use crate::Result;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A work shared between the workers of one crawl session
///
/// The tree sits behind a short-lived [`std::sync::Mutex`] that is never held
/// across an `.await`. Cache writes go through a separate async lock so that
/// concurrent [`save`](Self::save) calls never interleave on disk.
#[derive(Debug)]
pub struct SharedWork {
    tree: Mutex<Work>,
    save_lock: tokio::sync::Mutex<()>,
}

impl SharedWork {
    pub fn new(work: Work) -> Self {
        Self {
            tree: Mutex::new(work),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Work> {
        // A worker that panicked mid-update leaves a tree that is still
        // structurally valid; keep going with it.
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with shared access to the tree
    pub fn read<R>(&self, f: impl FnOnce(&Work) -> R) -> R {
        f(&self.lock())
    }

    /// Runs `f` with exclusive access to the tree
    pub fn write<R>(&self, f: impl FnOnce(&mut Work) -> R) -> R {
        f(&mut self.lock())
    }

    /// Copy of the current tree
    pub fn snapshot(&self) -> Work {
        self.read(Work::clone)
    }

    /// Persists the tree through `store`
    ///
    /// The tree is encoded while the save lock is held, so the file on disk
    /// always reflects the most recent of any set of concurrent saves.
    pub async fn save(&self, store: &CacheStore) -> Result<PathBuf> {
        let _guard = self.save_lock.lock().await;
        let (path, bytes) = self.read(|work| -> Result<_> {
            Ok((store.cache_path(work)?, encode(work)?))
        })?;
        write_replacing(&path, &bytes).await?;
        tracing::debug!("Saved cache {}", path.display());
        Ok(path)
    }
}
