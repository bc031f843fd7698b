use crate::detector::RawDetection;
use std::cmp::Ordering;

/// Raw output layouts of the YOLO family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputLayout {
    /// `[1, 4 + nc, anchors]`: `cx, cy, w, h` rows then one score row per class
    Anchors { num_classes: usize, num_anchors: usize },
    /// `[1, max_det, 6]`: `x1, y1, x2, y2, score, class` per row, NMS already applied
    EndToEnd { num_rows: usize },
}

impl OutputLayout {
    fn detect(shape: &[usize]) -> anyhow::Result<Self> {
        if shape.len() != 3 || shape[0] == 0 {
            anyhow::bail!("Unsupported model output shape {:?}", shape);
        }

        if shape[1] > 4 && shape[1] < shape[2] {
            Ok(Self::Anchors {
                num_classes: shape[1] - 4,
                num_anchors: shape[2],
            })
        } else if shape[2] == 6 {
            Ok(Self::EndToEnd { num_rows: shape[1] })
        } else {
            anyhow::bail!("Unsupported model output shape {:?}", shape)
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    /// Boxes are clamped to `[0, width] x [0, height]` of the model input
    pub input_size: (u32, u32),
}

impl PostProcessor {
    pub fn new(
        confidence_threshold: f32,
        iou_threshold: f32,
        max_detections: usize,
        input_size: (u32, u32),
    ) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
            input_size,
        }
    }

    /// Parse detections for the first image of the batch.
    ///
    /// Output is ordered by descending confidence.
    #[tracing::instrument(level = "debug", skip_all, fields(shape = ?predictions.shape()))]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
    ) -> anyhow::Result<Vec<RawDetection>> {
        match OutputLayout::detect(predictions.shape())? {
            OutputLayout::Anchors {
                num_classes,
                num_anchors,
            } => {
                let candidates = self.decode_anchors(predictions, num_classes, num_anchors);
                Ok(non_maximum_suppression(
                    candidates,
                    self.iou_threshold,
                    self.max_detections,
                ))
            }
            OutputLayout::EndToEnd { num_rows } => Ok(self.decode_end_to_end(predictions, num_rows)),
        }
    }

    fn decode_anchors(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        num_classes: usize,
        num_anchors: usize,
    ) -> Vec<RawDetection> {
        let mut candidates = Vec::new();

        for a in 0..num_anchors {
            // argmax over class score rows
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, 4 + c, a]];
                if score > confidence {
                    confidence = score;
                    class_id = c;
                }
            }

            if confidence.is_nan() || confidence <= self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(
                predictions[[0, 0, a]],
                predictions[[0, 1, a]],
                predictions[[0, 2, a]],
                predictions[[0, 3, a]],
            );

            candidates.push(RawDetection {
                bbox: self.clamp_box([x1, y1, x2, y2]),
                confidence,
                class_id,
            });
        }

        candidates
    }

    fn decode_end_to_end(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        num_rows: usize,
    ) -> Vec<RawDetection> {
        let mut detections = Vec::new();

        for i in 0..num_rows {
            let confidence = predictions[[0, i, 4]];
            if confidence.is_nan() || confidence <= self.confidence_threshold {
                continue;
            }

            detections.push(RawDetection {
                bbox: self.clamp_box([
                    predictions[[0, i, 0]],
                    predictions[[0, i, 1]],
                    predictions[[0, i, 2]],
                    predictions[[0, i, 3]],
                ]),
                confidence,
                class_id: predictions[[0, i, 5]].round().max(0.0) as usize,
            });
        }

        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detections.truncate(self.max_detections);
        detections
    }

    fn clamp_box(&self, [x1, y1, x2, y2]: [f32; 4]) -> [f32; 4] {
        let w = self.input_size.0 as f32;
        let h = self.input_size.1 as f32;
        [
            x1.clamp(0.0, w),
            y1.clamp(0.0, h),
            x2.clamp(0.0, w),
            y2.clamp(0.0, h),
        ]
    }
}

/// Class-aware greedy NMS. Keeps the highest-confidence box of every
/// overlapping same-class group, at most `max_detections` in total.
pub fn non_maximum_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two corner-format boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = inter_w * inter_h;

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    match union.partial_cmp(&0.0) {
        Some(Ordering::Greater) => inter / union,
        _ => 0.0,
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
