//! Transformed-output cache.
//!
//! Encoding is the bottleneck of a delivery. A 2000px AVIF can take seconds
//! through rav1e, so every transformed result is written to disk and later
//! requests with the same effective parameters are served straight from the
//! file.
//!
//! # Cache keys
//!
//! The cache is a flat directory. Each entry's file name is derived from the
//! request alone:
//!
//! ```text
//! <asset id>?<sorted query params>.<format>
//!
//! 3f2a-9c?.webp                 no dimensions
//! 3f2a-9c?width=50.webp
//! 3f2a-9c?height=25&width=50.avif
//! ```
//!
//! - Parameters are serialized in sorted key order, so the order a caller
//!   supplied them in never matters.
//! - Absent parameters are omitted entirely; `?.webp` and `?width=50.webp`
//!   can never alias.
//! - The format is the canonical extension, so `jpg` and `jpeg` requests
//!   share one entry.
//!
//! Derivation is a pure function of its inputs; no state, no hashing of
//! file contents. The original is assumed immutable for a given asset id.
//!
//! # Writes
//!
//! Writes are fire-and-forget: [`CacheStore::spawn_write`] detaches a task
//! and the response never waits for it. Failures are logged, never
//! surfaced. Each write goes to a temporary sibling first and is renamed
//! into place, so a concurrent reader sees either no entry or a complete
//! one. Two requests racing on the same key both write; last rename wins,
//! and both produced the same bytes.
//!
//! When a seed directory is configured, every entry is mirrored there too
//! (used to capture a warm cache for fresh deployments).

use crate::imaging::ImageFormat;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
#[error("cache write to {} failed: {source}", path.display())]
pub struct CacheWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Deterministic location of one cached result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    file_name: String,
    path: PathBuf,
}

impl CacheKey {
    /// Derive the key for `(asset_id, format, width, height)` under `cache_dir`.
    pub fn derive(
        cache_dir: &Path,
        asset_id: &str,
        format: ImageFormat,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Self {
        let file_name = format!(
            "{}?{}.{}",
            asset_id,
            query_string(width, height),
            format.extension()
        );
        let path = cache_dir.join(&file_name);
        Self { file_name, path }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The same entry under another root (the seed mirror).
    fn rebased(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name)
    }
}

/// `key=value` pairs joined by `&`, sorted by key, absent values omitted.
fn query_string(width: Option<u32>, height: Option<u32>) -> String {
    let params: BTreeMap<&str, u32> = [("width", width), ("height", height)]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// The on-disk cache directory, plus an optional seed mirror.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    seed_dir: Option<PathBuf>,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seed_dir: None,
        }
    }

    /// Mirror every write into `seed_dir` as well.
    pub fn with_seed_dir(mut self, seed_dir: impl Into<PathBuf>) -> Self {
        self.seed_dir = Some(seed_dir.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(
        &self,
        asset_id: &str,
        format: ImageFormat,
        width: Option<u32>,
        height: Option<u32>,
    ) -> CacheKey {
        CacheKey::derive(&self.dir, asset_id, format, width, height)
    }

    /// Read a cached entry. Any failure counts as a miss; only errors other
    /// than "not found" are logged.
    pub async fn read(&self, key: &CacheKey) -> Option<Bytes> {
        match tokio::fs::read(key.path()).await {
            Ok(bytes) => Some(Bytes::from(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Persist an entry (and its seed mirror) and wait for completion.
    pub async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheWriteError> {
        write_atomic(key.path(), bytes).await?;
        if let Some(seed_dir) = &self.seed_dir {
            write_atomic(&key.rebased(seed_dir), bytes).await?;
        }
        Ok(())
    }

    /// Persist an entry on a detached task.
    ///
    /// The returned handle may be awaited (tests, the CLI before exit) or
    /// dropped; dropping it does not cancel the write.
    pub fn spawn_write(&self, key: CacheKey, bytes: Bytes) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            match store.write(&key, &bytes).await {
                Ok(()) => tracing::debug!(key = %key, bytes = bytes.len(), "cache entry written"),
                Err(e) => tracing::warn!(key = %key, error = %e, "cache write failed"),
            }
        })
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheWriteError> {
    let wrap = |source| CacheWriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    let tmp = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(wrap(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(wrap(e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}-{n}.tmp", std::process::id()))
}
