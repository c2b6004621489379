//! The closed set of deliverable formats.
//!
//! | Token | Format | MIME |
//! |---|---|---|
//! | `avif` | [`ImageFormat::Avif`] | `image/avif` |
//! | `webp` | [`ImageFormat::Webp`] | `image/webp` |
//! | `png` | [`ImageFormat::Png`] | `image/png` |
//! | `jpeg`, `jpg` | [`ImageFormat::Jpeg`] | `image/jpeg` |
//!
//! Tokens are matched case-sensitively. Anything else is unsupported and is
//! rejected before a file is opened or a codec runs.

use super::avif::AvifCodec;
use super::codec::{Codec, JpegCodec, PngCodec, WebpCodec};
use std::fmt;
use std::path::Path;

/// Every format tag accepted as a request token or original file extension.
pub const SUPPORTED_TOKENS: &[&str] = &["avif", "webp", "png", "jpeg", "jpg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Avif,
    Webp,
    Png,
    Jpeg,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [Self::Avif, Self::Webp, Self::Png, Self::Jpeg];

    /// Parse a format token (`"webp"`, `"jpg"`, ...). Case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "avif" => Some(Self::Avif),
            "webp" => Some(Self::Webp),
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Format of a file, judged by its extension alone.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_token)
    }

    pub fn is_supported(token: &str) -> bool {
        Self::from_token(token).is_some()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::Webp => "image/webp",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Canonical file extension; `jpg` requests share `jpeg` cache entries.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// The codec adapter for this format.
    pub fn codec(self) -> &'static dyn Codec {
        match self {
            Self::Avif => &AvifCodec,
            Self::Webp => &WebpCodec,
            Self::Png => &PngCodec,
            Self::Jpeg => &JpegCodec,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
