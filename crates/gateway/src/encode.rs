use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use preprocess::BgrImage;

pub const JPEG_QUALITY: u8 = 75;

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> anyhow::Result<Vec<u8>> {
    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, quality).encode_image(image)?;
    Ok(jpeg_bytes)
}

/// BGR canvas → RGB → JPEG → standard base64.
pub fn encode_jpeg_base64(canvas: &BgrImage) -> anyhow::Result<String> {
    let _span = common::span_debug!("encode_jpeg");
    let jpeg = encode_jpeg(&canvas.to_rgb(), JPEG_QUALITY)?;
    Ok(STANDARD.encode(jpeg))
}
