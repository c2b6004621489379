//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate cover-fit dimensions for a requested width and/or height.
///
/// One uniform scale factor is applied to both axes:
/// `scale = max(req_w / src_w, req_h / src_h)` over whichever of the two are
/// given, and each axis becomes `ceil(src * scale)`. The result therefore
/// covers the requested box and keeps the source aspect ratio.
///
/// Returns `None` when neither dimension is requested, or when the source has
/// a zero dimension (there is no meaningful scale).
///
/// The math is done on integers: the winning ratio is picked by
/// cross-multiplication and the constrained axis comes out exact, so
/// `ceil` never rounds up a floating-point error.
///
/// # Examples
/// ```
/// # use simple_img::imaging::cover_dimensions;
/// assert_eq!(cover_dimensions((100, 50), Some(50), None), Some((50, 25)));
/// assert_eq!(cover_dimensions((100, 50), None, Some(25)), Some((50, 25)));
/// assert_eq!(cover_dimensions((100, 50), Some(200), Some(200)), Some((400, 200)));
/// ```
pub fn cover_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return None;
    }

    // An unspecified dimension contributes no constraint.
    let req_w = u64::from(width.unwrap_or(0));
    let req_h = u64::from(height.unwrap_or(0));
    if req_w == 0 && req_h == 0 {
        return None;
    }

    let (src_w, src_h) = (u64::from(src_w), u64::from(src_h));

    // req_w / src_w >= req_h / src_h  <=>  req_w * src_h >= req_h * src_w
    let (num, den) = if req_w * src_h >= req_h * src_w {
        (req_w, src_w)
    } else {
        (req_h, src_h)
    };

    Some((scale_ceil(src_w, num, den), scale_ceil(src_h, num, den)))
}

/// Whether a resize would change the image at all.
pub fn needs_resize(source: (u32, u32), width: Option<u32>, height: Option<u32>) -> bool {
    cover_dimensions(source, width, height).is_some_and(|dims| dims != source)
}

/// Largest output the engine will produce: 100 megapixels, 400 MB of RGBA.
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// Whether a `width` x `height` RGBA buffer fits [`MAX_OUTPUT_PIXELS`].
pub fn within_pixel_budget(width: u32, height: u32) -> bool {
    u64::from(width) * u64::from(height) <= MAX_OUTPUT_PIXELS
}

/// `ceil(value * num / den)`, saturating at `u32::MAX`.
fn scale_ceil(value: u64, num: u64, den: u64) -> u32 {
    let scaled = (value * num).div_ceil(den);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}
