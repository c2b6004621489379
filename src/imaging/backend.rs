//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three pixel operations the
//! transform engine needs: decode, resize, and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), which dispatches to the
//! per-format [codec adapters](super::codec) and resizes with Lanczos3. Tests
//! substitute a recording mock to observe whether the engine ran at all.

use super::buffer::ImageBuffer;
use super::codec::CodecError;
use super::format::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image processing backends.
///
/// Backends are shared across requests and called from blocking worker
/// threads, hence `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Decode `bytes` stored in `format` into RGBA pixels.
    fn decode(&self, format: ImageFormat, bytes: &[u8]) -> Result<ImageBuffer, BackendError>;

    /// Resample to exactly `width` x `height`.
    fn resize(
        &self,
        buffer: ImageBuffer,
        width: u32,
        height: u32,
    ) -> Result<ImageBuffer, BackendError>;

    /// Encode pixels as `format`.
    fn encode(&self, format: ImageFormat, buffer: &ImageBuffer) -> Result<Vec<u8>, BackendError>;
}
