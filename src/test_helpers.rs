//! Shared test utilities for the simple-img test suite.
//!
//! Provides an isolated storage layout (originals + cache under one temp
//! directory) and writers for small synthetic originals.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let layout = StorageLayout::new();
//! layout.write_png("ab12", 100, 50);
//!
//! let deliverer = Deliverer::new(layout.originals(), CacheStore::new(layout.cache()));
//! // ...deliver, then:
//! assert_eq!(layout.cache_entries(), vec!["ab12?width=50.webp"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Storage layout
// =========================================================================

/// `<tmp>/originals/` (created) and `<tmp>/cache/` (left for the cache to
/// create on first write).
pub struct StorageLayout {
    tmp: TempDir,
}

impl StorageLayout {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("originals")).unwrap();
        Self { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn originals(&self) -> PathBuf {
        self.tmp.path().join("originals")
    }

    pub fn cache(&self) -> PathBuf {
        self.tmp.path().join("cache")
    }

    /// Write raw bytes as an original, returning its path.
    pub fn write_original(&self, file_name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.originals().join(file_name);
        fs::write(&path, bytes).unwrap();
        path
    }

    /// Write a real `width` x `height` PNG original named `<id>.png`.
    pub fn write_png(&self, asset_id: &str, width: u32, height: u32) -> PathBuf {
        self.write_original(&format!("{asset_id}.png"), &png_bytes(width, height))
    }

    /// Cache entry file names, sorted. Empty if the cache dir does not exist.
    pub fn cache_entries(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.cache()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

/// A left-to-right gradient, so resizes have something to interpolate.
pub fn gradient_rgba(width: u32, height: u32) -> image::RgbaImage {
    image::RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        image::Rgba([r, g, 128, 255])
    })
}

/// Encode a gradient as PNG bytes.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    gradient_rgba(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Decode any supported bytes and return their dimensions.
pub fn decoded_dimensions(bytes: &[u8], format: crate::imaging::ImageFormat) -> (u32, u32) {
    format.codec().decode(bytes).unwrap().dimensions()
}
