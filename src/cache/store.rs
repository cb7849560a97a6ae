use crate::tree::Work;
use crate::{Result, ScrollError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Name of the cache file inside a work's directory
pub const CACHE_FILE_NAME: &str = "cache.json";

/// Reads and writes per-work cache files under an output root
///
/// The cache of a work lives at `<root>/<work.directory_name>/cache.json`.
/// The store itself holds no lock. Concurrent saves each land a whole
/// document, and the last rename wins; [`SharedWork::save`](super::SharedWork::save)
/// additionally orders saves so the newest tree is the one left on disk.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory every file of `work` is written under
    pub fn work_dir(&self, work: &Work) -> Result<PathBuf> {
        Ok(self.root.join(work.directory_name()?))
    }

    pub fn cache_path(&self, work: &Work) -> Result<PathBuf> {
        Ok(self.work_dir(work)?.join(CACHE_FILE_NAME))
    }

    /// Loads the cached copy of `work`, if one exists
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Work))` - Cache found; back-references already point into it
    /// * `Ok(None)` - No cache file yet
    /// * `Err(ScrollError::CacheCorruption)` - The file exists but is not a cache
    /// * `Err(ScrollError::Io)` - The file could not be read
    pub async fn load(&self, work: &Work) -> Result<Option<Work>> {
        let path = self.cache_path(work)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cache at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut cached: Work = serde_json::from_slice(&bytes)
            .map_err(|source| ScrollError::CacheCorruption {
                path: path.clone(),
                source,
            })?;
        cached.relink();

        tracing::debug!(
            "Loaded cache {} ({} units, {} items)",
            path.display(),
            cached.units.len(),
            cached.item_count()
        );
        Ok(Some(cached))
    }

    /// Serializes `work` to its cache file
    ///
    /// The document is written next to the target and renamed into place, so
    /// the cache file is always either the previous or the new version.
    pub async fn save(&self, work: &Work) -> Result<PathBuf> {
        let path = self.cache_path(work)?;
        let bytes = encode(work)?;
        write_replacing(&path, &bytes).await?;
        Ok(path)
    }
}

/// Encodes a work in the cache format
pub(crate) fn encode(work: &Work) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(work)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes `bytes` to `path` through a sibling temporary file
///
/// Every call writes its own temporary file, which is removed again if the
/// write or the rename fails.
pub(crate) async fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    let written = match fs::write(&tmp, bytes).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ));
    PathBuf::from(tmp)
}
