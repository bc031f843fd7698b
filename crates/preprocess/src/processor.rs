use crate::channels::{BgrImage, decode_rgb};
use crate::config::INPUT_SIZE;
use anyhow::Context;
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::RgbImage;

/// Output of [`PreProcessor::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Dimensions of the upload before resizing.
    pub original_size: (u32, u32),
    /// Resized image in BGR order; overlays are drawn here.
    pub canvas: BgrImage,
    /// The same pixels in RGB order, as handed to the model.
    pub model_input: RgbImage,
}

/// Turns uploaded bytes into the fixed-size buffers the detector and the
/// overlay renderer work on.
///
/// Resizing is a plain scale to `input_size` (no crop, no letterbox), so
/// non-square uploads are distorted.
#[derive(Debug, Clone)]
pub struct PreProcessor {
    pub input_size: (u32, u32),
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }

    pub fn prepare(&self, bytes: &[u8]) -> anyhow::Result<PreparedImage> {
        let _s = span!("prepare_image");

        let rgb = {
            let _s = span!("decode");
            decode_rgb(bytes)?
        };
        let original_size = rgb.dimensions();

        tracing::debug!(upload_bytes = bytes.len(), "Decoded upload");

        let bgr = BgrImage::from_rgb(&rgb);
        let canvas = self.resize(&bgr)?;
        let model_input = canvas.to_rgb();

        Ok(PreparedImage {
            original_size,
            canvas,
            model_input,
        })
    }

    /// Scales `src` to exactly `input_size` with a bilinear filter.
    pub fn resize(&self, src: &BgrImage) -> anyhow::Result<BgrImage> {
        let _s = span!("resize");

        let (width, height) = src.dimensions();
        let (dst_width, dst_height) = self.input_size;

        let src_view = ImageRef::new(width, height, src.as_bytes(), PixelType::U8x3)
            .context("Source image has invalid dimensions")?;
        let mut resized = Image::new(dst_width, dst_height, PixelType::U8x3);

        Resizer::new().resize(
            &src_view,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        BgrImage::from_raw(dst_width, dst_height, resized.buffer().to_vec())
            .ok_or_else(|| anyhow::anyhow!("Resized buffer does not match {dst_width}x{dst_height}"))
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(INPUT_SIZE)
    }
}
