use image::{ImageBuffer, Rgb, RgbImage};

/// Decodes an uploaded image (any format the `image` crate recognizes) into
/// 8-bit RGB.
pub fn decode_rgb(bytes: &[u8]) -> anyhow::Result<RgbImage> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(decoded.to_rgb8())
}

/// A packed 8-bit image whose channels are stored blue, green, red.
///
/// The underlying buffer reuses `image`'s `Rgb<u8>` pixel container so the
/// `imageproc` drawing routines can paint on it; colours written through
/// [`BgrImage::canvas_mut`] must therefore be given as `[b, g, r]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BgrImage {
    buffer: ImageBuffer<Rgb<u8>, Vec<u8>>,
}

impl BgrImage {
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        Self {
            buffer: swap_red_blue(rgb),
        }
    }

    pub fn from_raw(width: u32, height: u32, bgr: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, bgr).map(|buffer| Self { buffer })
    }

    pub fn to_rgb(&self) -> RgbImage {
        swap_red_blue(&self.buffer)
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Mutable access for drawing. Channel 0 is blue.
    pub fn canvas_mut(&mut self) -> &mut ImageBuffer<Rgb<u8>, Vec<u8>> {
        &mut self.buffer
    }
}

fn swap_red_blue(src: &ImageBuffer<Rgb<u8>, Vec<u8>>) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let mut out = src.clone();
    for px in out.pixels_mut() {
        px.0.swap(0, 2);
    }
    out
}
