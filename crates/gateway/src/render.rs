use crate::response::Prediction;
use ab_glyph::{FontArc, PxScale};
use anyhow::Context;
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use preprocess::BgrImage;

const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Green, in BGR channel order.
const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 16.0;
/// Text is stroked this many times, one pixel apart horizontally
const LABEL_THICKNESS: i32 = 2;
/// Label baseline sits this far above the box's top edge
const LABEL_OFFSET: i32 = 10;

/// Draws detection boxes and `"<class> <confidence>"` labels onto a BGR canvas.
pub struct OverlayRenderer {
    font: FontArc,
    scale: PxScale,
    color: Rgb<u8>,
}

impl OverlayRenderer {
    pub fn new() -> anyhow::Result<Self> {
        let font = FontArc::try_from_slice(FONT_DATA).context("Failed to load overlay font")?;
        Ok(Self {
            font,
            scale: PxScale::from(LABEL_SCALE),
            color: OVERLAY_COLOR,
        })
    }

    pub fn draw(&self, canvas: &mut BgrImage, predictions: &[Prediction]) {
        let _span = common::span_debug!("render_overlay");
        let buffer = canvas.canvas_mut();

        for prediction in predictions {
            let [x1, y1, x2, y2] = prediction.bbox;

            for t in 0..BOX_THICKNESS {
                let width = x2 - x1 + 1 - 2 * t;
                let height = y2 - y1 + 1 - 2 * t;
                if width <= 0 || height <= 0 {
                    break;
                }
                let rect = Rect::at(x1 + t, y1 + t).of_size(width as u32, height as u32);
                draw_hollow_rect_mut(buffer, rect, self.color);
            }

            let label = format!("{} {:.2}", prediction.class_name, prediction.confidence);
            let (_, text_height) = text_size(self.scale, &self.font, &label);
            let top = y1 - LABEL_OFFSET - text_height as i32;
            for t in 0..LABEL_THICKNESS {
                draw_text_mut(buffer, self.color, x1 + t, top, self.scale, &self.font, &label);
            }
        }
    }
}
