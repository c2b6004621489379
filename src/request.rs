//! Validated delivery requests.
//!
//! An asset file name has the shape `^[a-f0-9-]+(\.\w*)?$`: a lowercase hex
//! identifier (dashes allowed, as in a UUID), optionally followed by one
//! extension. The extension names the default output format; an explicit
//! `format` overrides it.
//!
//! ```text
//! 3f2a-9c.webp              → id 3f2a-9c, format "webp"
//! 3f2a-9c.webp?format=avif  → id 3f2a-9c, format "avif"
//! 3f2a-9c                   → id 3f2a-9c, format ""  (unsupported unless overridden)
//! ```
//!
//! Construction checks shape only. Whether the format is supported is decided
//! by the orchestrator so the rejection carries the right status class.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid asset name {0:?}")]
    InvalidAssetName(String),
    #[error("{0} must be a positive integer")]
    NonPositiveDimension(&'static str),
}

/// One immutable delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    asset_id: String,
    format: String,
    width: Option<u32>,
    height: Option<u32>,
}

impl AssetRequest {
    /// Build a request from an asset file name and optional overrides.
    pub fn parse(
        asset_file: &str,
        format: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Self, RequestError> {
        let (asset_id, extension) = split_asset_file(asset_file)
            .ok_or_else(|| RequestError::InvalidAssetName(asset_file.to_string()))?;
        if width == Some(0) {
            return Err(RequestError::NonPositiveDimension("width"));
        }
        if height == Some(0) {
            return Err(RequestError::NonPositiveDimension("height"));
        }
        Ok(Self {
            asset_id: asset_id.to_string(),
            format: format.unwrap_or(extension).to_string(),
            width,
            height,
        })
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Effective requested format token: explicit override, else extension.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// Whether any dimension was requested.
    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// Split `id[.ext]`, returning `None` if the name is outside the charset.
fn split_asset_file(name: &str) -> Option<(&str, &str)> {
    let (id, ext) = match name.split_once('.') {
        Some((id, ext)) => (id, ext),
        None => (name, ""),
    };
    let id_ok = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b) || b == b'-');
    let ext_ok = ext.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    (id_ok && ext_ok).then_some((id, ext))
}
