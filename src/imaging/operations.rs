//! High-level image operations.
//!
//! These functions combine the dimension [calculations](super::calculations)
//! with backend execution. The delivery layer calls [`transform`]; the finer
//! [`resize`] and [`transcode`] steps are public for callers that already
//! hold pixels.

use super::backend::{BackendError, ImageBackend};
use super::buffer::ImageBuffer;
use super::calculations::{MAX_OUTPUT_PIXELS, cover_dimensions, needs_resize, within_pixel_budget};
use super::format::ImageFormat;
use thiserror::Error;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Cover-fit resize. Returns the buffer untouched when nothing is requested
/// or the computed size equals the current one.
///
/// Targets above [`MAX_OUTPUT_PIXELS`] fail before the backend allocates
/// anything.
pub fn resize(
    backend: &impl ImageBackend,
    buffer: ImageBuffer,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<ImageBuffer> {
    let source = buffer.dimensions();
    if !needs_resize(source, width, height) {
        return Ok(buffer);
    }
    let Some((w, h)) = cover_dimensions(source, width, height) else {
        return Ok(buffer);
    };
    if !within_pixel_budget(w, h) {
        return Err(BackendError::ProcessingFailed(format!(
            "{w}x{h} exceeds the {MAX_OUTPUT_PIXELS} pixel output limit"
        )));
    }
    backend.resize(buffer, w, h)
}

/// Encode pixels as `target`.
pub fn transcode(
    backend: &impl ImageBackend,
    buffer: &ImageBuffer,
    target: ImageFormat,
) -> Result<Vec<u8>> {
    backend.encode(target, buffer)
}

/// What a [`transform`] call should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSpec {
    pub source_format: ImageFormat,
    pub target_format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Failure of one [`transform`] stage.
///
/// Decode failures mean the stored original is bad; the other two are
/// faults in producing the output.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("decode: {0}")]
    Decode(#[source] BackendError),
    #[error("resize: {0}")]
    Resize(#[source] BackendError),
    #[error("encode: {0}")]
    Encode(#[source] BackendError),
}

/// Decode the original, cover-fit resize it, and encode it as the target.
pub fn transform(
    backend: &impl ImageBackend,
    original: &[u8],
    spec: &TransformSpec,
) -> std::result::Result<Vec<u8>, TransformError> {
    let decoded = backend
        .decode(spec.source_format, original)
        .map_err(TransformError::Decode)?;
    let resized =
        resize(backend, decoded, spec.width, spec.height).map_err(TransformError::Resize)?;
    transcode(backend, &resized, spec.target_format).map_err(TransformError::Encode)
}
