//! Per-format codec adapters.
//!
//! Every adapter turns encoded bytes into an [`ImageBuffer`] and back. Output
//! is always normalized to RGBA8, so a grayscale PNG or an RGB JPEG decodes
//! to the same layout as a WebP with alpha.
//!
//! Encoder settings are fixed per format and not exposed:
//!
//! | Format | Decode | Encode |
//! |---|---|---|
//! | PNG | `image` | `PngEncoder`, default compression |
//! | JPEG | `image` | `JpegEncoder`, quality 85, alpha dropped |
//! | WebP | `image` | `WebPEncoder`, lossless (the only mode `image` ships) |
//! | AVIF | see [`avif`](super::avif) | see [`avif`](super::avif) |

use super::buffer::ImageBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use thiserror::Error;

const JPEG_QUALITY: u8 = 85;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// A decode/encode pair for one format.
///
/// Adapters hold no state; every call is independent.
pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError>;

    fn encode(&self, buffer: &ImageBuffer) -> Result<Vec<u8>, CodecError>;
}

pub struct PngCodec;
pub struct JpegCodec;
pub struct WebpCodec;

impl Codec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
        decode_with(bytes, image::ImageFormat::Png)
    }

    fn encode(&self, buffer: &ImageBuffer) -> Result<Vec<u8>, CodecError> {
        ensure_encodable(buffer)?;
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(
                buffer.data(),
                buffer.width(),
                buffer.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CodecError::Encode(format!("PNG: {e}")))?;
        Ok(out)
    }
}

impl Codec for JpegCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
        decode_with(bytes, image::ImageFormat::Jpeg)
    }

    fn encode(&self, buffer: &ImageBuffer) -> Result<Vec<u8>, CodecError> {
        ensure_encodable(buffer)?;
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(buffer.clone().into_rgba()).to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::Encode(format!("JPEG: {e}")))?;
        Ok(out)
    }
}

impl Codec for WebpCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
        decode_with(bytes, image::ImageFormat::WebP)
    }

    fn encode(&self, buffer: &ImageBuffer) -> Result<Vec<u8>, CodecError> {
        ensure_encodable(buffer)?;
        let mut out = Vec::new();
        WebPEncoder::new_lossless(&mut out)
            .write_image(
                buffer.data(),
                buffer.width(),
                buffer.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CodecError::Encode(format!("WebP: {e}")))?;
        Ok(out)
    }
}

/// Decode with an explicit container format; content sniffing would let a
/// PNG named `.webp` slip through as valid.
fn decode_with(bytes: &[u8], format: image::ImageFormat) -> Result<ImageBuffer, CodecError> {
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CodecError::Decode(format!("{format:?}: {e}")))?;
    Ok(ImageBuffer::from_rgba(img.to_rgba8()))
}

pub(crate) fn ensure_encodable(buffer: &ImageBuffer) -> Result<(), CodecError> {
    if buffer.width() == 0 || buffer.height() == 0 {
        return Err(CodecError::Encode(format!(
            "cannot encode a {}x{} image",
            buffer.width(),
            buffer.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    fn gradient(width: u32, height: u32) -> ImageBuffer {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        ImageBuffer::from_rgba(img)
    }

    #[test]
    fn png_roundtrip_is_lossless() {
        let original = gradient(17, 9);
        let bytes = PngCodec.encode(&original).unwrap();
        let decoded = PngCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn webp_roundtrip_is_lossless() {
        let original = gradient(20, 12);
        let bytes = WebpCodec.encode(&original).unwrap();
        let decoded = WebpCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn jpeg_roundtrip_keeps_dimensions_and_opaque_alpha() {
        let original = gradient(32, 24);
        let bytes = JpegCodec.encode(&original).unwrap();
        let decoded = JpegCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 24));
        assert!(decoded.data().chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn rgb_source_gains_alpha_channel() {
        let rgb = RgbImage::from_pixel(5, 4, image::Rgb([200, 100, 50]));
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(rgb.as_raw(), 5, 4, ExtendedColorType::Rgb8)
            .unwrap();

        let decoded = PngCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.data().len(), 5 * 4 * 4);
        assert_eq!(&decoded.data()[..4], &[200, 100, 50, 255]);
    }

    #[test]
    fn grayscale_source_expands_to_rgba() {
        let gray = GrayImage::from_pixel(3, 3, image::Luma([77]));
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(gray.as_raw(), 3, 3, ExtendedColorType::L8)
            .unwrap();

        let decoded = PngCodec.decode(&bytes).unwrap();
        assert_eq!(&decoded.data()[..4], &[77, 77, 77, 255]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let junk = b"definitely not an image";
        assert!(matches!(PngCodec.decode(junk), Err(CodecError::Decode(_))));
        assert!(matches!(JpegCodec.decode(junk), Err(CodecError::Decode(_))));
        assert!(matches!(WebpCodec.decode(junk), Err(CodecError::Decode(_))));
    }

    #[test]
    fn png_bytes_are_not_valid_webp() {
        let png = PngCodec.encode(&gradient(4, 4)).unwrap();
        assert!(matches!(WebpCodec.decode(&png), Err(CodecError::Decode(_))));
    }

    #[test]
    fn zero_sized_buffer_fails_to_encode() {
        let empty = ImageBuffer::new(0, 0, Vec::new());
        assert!(matches!(PngCodec.encode(&empty), Err(CodecError::Encode(_))));
        assert!(matches!(JpegCodec.encode(&empty), Err(CodecError::Encode(_))));
        assert!(matches!(WebpCodec.encode(&empty), Err(CodecError::Encode(_))));
    }
}
