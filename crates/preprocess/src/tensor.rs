use common::span_debug;
use image::RgbImage;
use ndarray::{Array, IxDyn};

/// Converts an RGB image into a `[1, 3, H, W]` planar tensor scaled to [0, 1].
pub fn to_input_tensor(image: &RgbImage) -> anyhow::Result<Array<f32, IxDyn>> {
    let _s = span_debug!("to_input_tensor");

    let width = image.width() as usize;
    let height = image.height() as usize;
    let spatial = width * height;

    let mut output = vec![0.0f32; 3 * spatial];

    for (i, px) in image.as_raw().chunks_exact(3).enumerate() {
        output[i] = px[0] as f32 / 255.0;
        output[i + spatial] = px[1] as f32 / 255.0;
        output[i + 2 * spatial] = px[2] as f32 / 255.0;
    }

    Ok(Array::from_shape_vec(
        IxDyn(&[1, 3, height, width]),
        output,
    )?)
}
