//! Decoded raster representation shared by every codec.
//!
//! An [`ImageBuffer`] is always 8-bit sRGB RGBA. Codecs that decode
//! grayscale or RGB sources add an opaque alpha channel so the rest of the
//! pipeline only ever deals with one pixel layout.

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Uncompressed RGBA8 pixels in sRGB.
///
/// `data.len() == width * height * 4` holds for every value of this type;
/// constructing one that breaks it panics.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap raw RGBA8 pixel data.
    ///
    /// # Panics
    ///
    /// If `data.len()` does not equal `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            expected_len(width, height),
            "RGBA buffer length does not match {width}x{height}"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// A buffer filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(expected_len(width, height))
            .collect();
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub(crate) fn from_rgba(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    pub(crate) fn into_rgba(self) -> image::RgbaImage {
        let (width, height) = (self.width, self.height);
        image::RgbaImage::from_raw(width, height, self.data)
            .unwrap_or_else(|| unreachable!("length invariant checked on construction"))
    }
}

// Pixel data is elided; a 4000x3000 image would flood the output.
impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}
