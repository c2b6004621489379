//! Finding originals on disk.
//!
//! Originals live in one flat directory, one file per asset, named after the
//! asset id plus whatever extension the asset was uploaded with:
//!
//! ```text
//! images/
//! ├── 3f2a-9c.jpg
//! ├── 77b0.png
//! └── cache/          ← ignored: not a file
//! ```
//!
//! [`find_candidates`] is a pure lister. It returns every file whose name is
//! the id itself or the id followed by `.` and anything, sorted by path so
//! that "first match" is stable across filesystems. Choosing between
//! duplicates is [`select_original`]'s job.

use crate::imaging::ImageFormat;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("cannot read originals directory {}: {source}", dir.display())]
pub struct LocateError {
    pub dir: PathBuf,
    #[source]
    pub source: io::Error,
}

/// List files in `base_dir` whose stem matches `asset_id` exactly.
///
/// An existing directory without matches yields an empty list; an unreadable
/// directory is an error. Returned paths are absolute.
pub async fn find_candidates(base_dir: &Path, asset_id: &str) -> Result<Vec<PathBuf>, LocateError> {
    let wrap = |source| LocateError {
        dir: base_dir.to_path_buf(),
        source,
    };
    let base = std::path::absolute(base_dir).map_err(wrap)?;
    let mut entries = tokio::fs::read_dir(&base).await.map_err(wrap)?;

    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(wrap)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !stem_matches(name, asset_id) {
            continue;
        }
        // Symlinks are followed; a dangling one is skipped.
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_file() => matches.push(entry.path()),
            _ => {}
        }
    }
    matches.sort();
    Ok(matches)
}

/// `name` is `asset_id` or `asset_id.<anything>`.
fn stem_matches(name: &str, asset_id: &str) -> bool {
    match name.strip_prefix(asset_id) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// Pick one original among candidates.
///
/// Prefers a candidate already stored in the requested format (so a
/// passthrough is possible); otherwise the first candidate.
pub fn select_original(candidates: &[PathBuf], requested: ImageFormat) -> Option<&PathBuf> {
    candidates
        .iter()
        .find(|path| ImageFormat::from_path(path) == Some(requested))
        .or_else(|| candidates.first())
}
