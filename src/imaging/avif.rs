//! AVIF adapter.
//!
//! The `image` crate's `"avif"` feature only enables the **encoder** (rav1e).
//! Its decoder needs `"avif-native"`, which links the C library dav1d. We
//! decode with `avif-parse` (container) + `rav1d` (pure Rust port of dav1d)
//! instead, and convert the YUV planes to RGBA ourselves.
//!
//! The primary item carries color. An auxiliary alpha item, when present, is
//! a monochrome AV1 frame decoded the same way; its luma becomes channel 3.
//! Without one the output is fully opaque.

use super::buffer::ImageBuffer;
use super::codec::{Codec, CodecError, ensure_encodable};
use image::codecs::avif::AvifEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// rav1e speed: 1 is slowest/smallest, 10 fastest. 4 trades well for assets
/// that are encoded once and then served from cache.
const ENCODE_SPEED: u8 = 4;
const ENCODE_QUALITY: u8 = 80;

pub struct AvifCodec;

impl Codec for AvifCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
        let avif = avif_parse::read_avif(&mut std::io::Cursor::new(bytes))
            .map_err(|e| CodecError::Decode(format!("AVIF container: {e:?}")))?;
        let color = decode_av1(&avif.primary_item)?;
        match &avif.alpha_item {
            Some(alpha) => with_alpha(color, &decode_av1(alpha)?),
            None => Ok(color),
        }
    }

    fn encode(&self, buffer: &ImageBuffer) -> Result<Vec<u8>, CodecError> {
        ensure_encodable(buffer)?;
        let mut out = Vec::new();
        AvifEncoder::new_with_speed_quality(&mut out, ENCODE_SPEED, ENCODE_QUALITY)
            .write_image(
                buffer.data(),
                buffer.width(),
                buffer.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CodecError::Encode(format!("AVIF: {e}")))?;
        Ok(out)
    }
}

/// Replace the alpha channel of `color` with the luma of a decoded alpha
/// plane (grey, so any of R/G/B will do).
fn with_alpha(color: ImageBuffer, alpha: &ImageBuffer) -> Result<ImageBuffer, CodecError> {
    if color.dimensions() != alpha.dimensions() {
        let (cw, ch) = color.dimensions();
        let (aw, ah) = alpha.dimensions();
        return Err(CodecError::Decode(format!(
            "AVIF alpha plane is {aw}x{ah}, image is {cw}x{ch}"
        )));
    }
    let (width, height) = color.dimensions();
    let mut data = color.into_data();
    for (px, a) in data.chunks_exact_mut(4).zip(alpha.data().chunks_exact(4)) {
        px[3] = a[0];
    }
    Ok(ImageBuffer::new(width, height, data))
}

/// Decode one AV1 frame with rav1d.
fn decode_av1(av1_bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use std::ptr::NonNull;

    if av1_bytes.is_empty() {
        return Err(CodecError::Decode("AVIF item is empty".into()));
    }

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| CodecError::Decode("rav1d settings allocation failed".into()))?;
    unsafe { rav1d::src::lib::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc =
        unsafe { rav1d::src::lib::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(CodecError::Decode(format!("rav1d open failed ({})", rc.0)));
    }

    let mut data = Dav1dData::default();
    let buf_ptr =
        unsafe { rav1d::src::lib::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(CodecError::Decode("rav1d data_create failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { rav1d::src::lib::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            rav1d::src::lib::dav1d_data_unref(NonNull::new(&mut data));
            rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(CodecError::Decode(format!(
            "rav1d send_data failed ({})",
            rc.0
        )));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { rav1d::src::lib::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(CodecError::Decode(format!(
            "rav1d get_picture failed ({})",
            rc.0
        )));
    }

    let w = pic.p.w as u32;
    let h = pic.p.h as u32;
    let layout = pic.p.layout;

    let subsampling = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => Some((false, false)),
        DAV1D_PIXEL_LAYOUT_I420 => Some((true, true)),
        DAV1D_PIXEL_LAYOUT_I422 => Some((true, false)),
        DAV1D_PIXEL_LAYOUT_I444 => Some((false, false)),
        _ => None,
    };
    let monochrome = layout == DAV1D_PIXEL_LAYOUT_I400;

    let planes = match (subsampling, pic.data[0]) {
        (Some((ss_x, ss_y)), Some(y)) => {
            let y_ptr = y.as_ptr() as *const u8;
            let (u_ptr, v_ptr) = if monochrome {
                (Some(y_ptr), Some(y_ptr))
            } else {
                (
                    pic.data[1].map(|p| p.as_ptr() as *const u8),
                    pic.data[2].map(|p| p.as_ptr() as *const u8),
                )
            };
            match (u_ptr, v_ptr) {
                (Some(u_ptr), Some(v_ptr)) => Some(YuvPlanes {
                    y_ptr,
                    u_ptr,
                    v_ptr,
                    y_stride: pic.stride[0],
                    uv_stride: if monochrome { 0 } else { pic.stride[1] },
                    width: w,
                    height: h,
                    bpc: pic.p.bpc as u32,
                    ss_x,
                    ss_y,
                    monochrome,
                }),
                _ => None,
            }
        }
        _ => None,
    };

    let rgba = planes.map(|p| p.to_rgba());

    unsafe {
        rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic));
        rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
    }

    match rgba {
        Some(rgba) => Ok(ImageBuffer::new(w, h, rgba)),
        None => Err(CodecError::Decode(format!(
            "unsupported AVIF picture (layout {layout})"
        ))),
    }
}

/// Decoded YUV plane data from rav1d, ready for RGB conversion.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling: horizontal, vertical (e.g. I420 = true, true)
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes {
    /// Convert to interleaved RGBA8 (BT.601), alpha 255.
    fn to_rgba(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgba = vec![0u8; self.width as usize * self.height as usize * 4];

        for row in 0..self.height {
            for col in 0..self.width {
                let y_val = read_sample(self.y_ptr, self.y_stride, col, row, self.bpc);

                let (r, g, b) = if self.monochrome {
                    let v = (y_val * scale).clamp(0.0, 255.0);
                    (v, v, v)
                } else {
                    let u_col = if self.ss_x { col / 2 } else { col };
                    let u_row = if self.ss_y { row / 2 } else { row };
                    let cb = read_sample(self.u_ptr, self.uv_stride, u_col, u_row, self.bpc) - center;
                    let cr = read_sample(self.v_ptr, self.uv_stride, u_col, u_row, self.bpc) - center;

                    (
                        ((y_val + 1.402 * cr) * scale).clamp(0.0, 255.0),
                        ((y_val - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                        ((y_val + 1.772 * cb) * scale).clamp(0.0, 255.0),
                    )
                };

                let idx = (row as usize * self.width as usize + col as usize) * 4;
                rgba[idx] = r as u8;
                rgba[idx + 1] = g as u8;
                rgba[idx + 2] = b as u8;
                rgba[idx + 3] = 255;
            }
        }

        rgba
    }
}

/// Read one sample; 10- and 12-bit planes are stored as u16.
#[inline]
fn read_sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { *(ptr.offset(byte_offset) as *const u16) }) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> ImageBuffer {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 128, 255])
        });
        ImageBuffer::from_rgba(img)
    }

    #[test]
    fn encode_then_decode_keeps_dimensions() {
        let bytes = AvifCodec.encode(&gradient(64, 48)).unwrap();
        assert!(!bytes.is_empty());

        let decoded = AvifCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
        assert!(decoded.data().chunks(4).all(|px| px[3] >= 250));
    }

    #[test]
    fn transparency_survives_roundtrip() {
        // Left half fully transparent, right half opaque.
        let img = image::RgbaImage::from_fn(32, 32, |x, _| {
            let a = if x < 16 { 0 } else { 255 };
            image::Rgba([200, 40, 40, a])
        });
        let bytes = AvifCodec.encode(&ImageBuffer::from_rgba(img)).unwrap();

        let decoded = AvifCodec.decode(&bytes).unwrap();
        let alpha_at = |x: u32, y: u32| decoded.data()[((y * 32 + x) * 4 + 3) as usize];
        assert!(alpha_at(0, 0) <= 20, "alpha at (0,0) = {}", alpha_at(0, 0));
        assert!(alpha_at(4, 20) <= 20);
        assert!(alpha_at(31, 31) >= 230, "alpha at (31,31) = {}", alpha_at(31, 31));
        assert!(alpha_at(24, 8) >= 230);
    }

    #[test]
    fn alpha_plane_size_mismatch_is_decode_error() {
        let color = ImageBuffer::filled(4, 4, [1, 2, 3, 255]);
        let alpha = ImageBuffer::filled(2, 2, [0, 0, 0, 255]);
        assert!(matches!(
            with_alpha(color, &alpha),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn with_alpha_copies_luma_into_channel_three() {
        let color = ImageBuffer::filled(2, 1, [10, 20, 30, 255]);
        let alpha = ImageBuffer::new(2, 1, vec![0, 0, 0, 255, 128, 128, 128, 255]);
        let out = with_alpha(color, &alpha).unwrap();
        assert_eq!(out.data(), &[10, 20, 30, 0, 10, 20, 30, 128]);
    }

    #[test]
    fn odd_dimensions_survive_chroma_subsampling() {
        let bytes = AvifCodec.encode(&gradient(33, 17)).unwrap();
        let decoded = AvifCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (33, 17));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = AvifCodec.decode(b"not an avif container");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn zero_sized_buffer_fails_to_encode() {
        let empty = ImageBuffer::new(0, 4, Vec::new());
        assert!(matches!(AvifCodec.encode(&empty), Err(CodecError::Encode(_))));
    }
}
