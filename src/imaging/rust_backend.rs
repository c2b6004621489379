//! Pure Rust image processing backend: zero system libraries.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode / encode (JPEG, PNG, WebP) | `image` crate codecs |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode) + custom YUV→RGB |
//! | Encode (AVIF) | `image::codecs::avif::AvifEncoder` (rav1e) |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |

use super::backend::{BackendError, ImageBackend};
use super::buffer::ImageBuffer;
use super::format::ImageFormat;
use image::imageops::FilterType;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, format: ImageFormat, bytes: &[u8]) -> Result<ImageBuffer, BackendError> {
        Ok(format.codec().decode(bytes)?)
    }

    fn resize(
        &self,
        buffer: ImageBuffer,
        width: u32,
        height: u32,
    ) -> Result<ImageBuffer, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        if buffer.dimensions() == (width, height) {
            return Ok(buffer);
        }
        let resized =
            image::imageops::resize(&buffer.into_rgba(), width, height, FilterType::Lanczos3);
        Ok(ImageBuffer::from_rgba(resized))
    }

    fn encode(&self, format: ImageFormat, buffer: &ImageBuffer) -> Result<Vec<u8>, BackendError> {
        Ok(format.codec().encode(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::CodecError;

    fn checkerboard(width: u32, height: u32) -> ImageBuffer {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        ImageBuffer::from_rgba(img)
    }

    #[test]
    fn resize_produces_requested_dimensions() {
        let backend = RustBackend::new();
        let resized = backend.resize(checkerboard(100, 50), 50, 25).unwrap();
        assert_eq!(resized.dimensions(), (50, 25));
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let backend = RustBackend::new();
        let source = checkerboard(16, 16);
        let resized = backend.resize(source.clone(), 16, 16).unwrap();
        assert_eq!(resized, source);
    }

    #[test]
    fn resize_interpolates_rather_than_picking_pixels() {
        // Halving a 1px black/white stripe pattern must blend to grey;
        // nearest-neighbor would keep pure black or white.
        let img = image::RgbaImage::from_fn(8, 8, |x, _| {
            if x % 2 == 0 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        let backend = RustBackend::new();
        let resized = backend
            .resize(ImageBuffer::from_rgba(img), 4, 4)
            .unwrap();
        let center = &resized.data()[(4 + 1) * 4..(4 + 1) * 4 + 4];
        assert!(center[0] > 20 && center[0] < 235, "got {}", center[0]);
    }

    #[test]
    fn resize_to_zero_fails() {
        let backend = RustBackend::new();
        let result = backend.resize(checkerboard(8, 8), 0, 4);
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn decode_dispatches_on_format() {
        let backend = RustBackend::new();
        let png = backend.encode(ImageFormat::Png, &checkerboard(8, 8)).unwrap();

        assert_eq!(
            backend.decode(ImageFormat::Png, &png).unwrap().dimensions(),
            (8, 8)
        );
        assert!(matches!(
            backend.decode(ImageFormat::Jpeg, &png),
            Err(BackendError::Codec(CodecError::Decode(_)))
        ));
    }

    #[test]
    fn every_format_pair_keeps_dimensions() {
        let backend = RustBackend::new();
        let source = checkerboard(24, 16);

        for from in ImageFormat::ALL {
            let encoded_a = backend.encode(from, &source).unwrap();
            let decoded_a = backend.decode(from, &encoded_a).unwrap();
            for to in ImageFormat::ALL {
                let encoded_b = backend.encode(to, &decoded_a).unwrap();
                let decoded_b = backend.decode(to, &encoded_b).unwrap();
                assert_eq!(
                    decoded_b.dimensions(),
                    (24, 16),
                    "{from} -> {to} changed dimensions"
                );
            }
        }
    }
}
