use crate::encode::encode_jpeg_base64;
use crate::render::OverlayRenderer;
use crate::response::{PredictResponse, Prediction};
use anyhow::Context;
use inference::{Category, ClassNames, ModelLoader, RawDetection};
use preprocess::PreProcessor;

/// Per-request detection work: everything after the upload is validated.
pub struct Pipeline {
    preprocessor: PreProcessor,
    renderer: OverlayRenderer,
}

impl Pipeline {
    pub fn new(preprocessor: PreProcessor, renderer: OverlayRenderer) -> Self {
        Self {
            preprocessor,
            renderer,
        }
    }

    /// Blocking; call from a worker thread.
    pub fn run(
        &self,
        loader: &dyn ModelLoader,
        category: Category,
        upload: &[u8],
    ) -> anyhow::Result<PredictResponse> {
        let prepared = self.preprocessor.prepare(upload)?;
        let (original_width, original_height) = prepared.original_size;
        tracing::debug!(original_width, original_height, "Upload resized to model input");

        let detector = loader.load(category)?;
        let raw = detector.detect(&prepared.model_input)?;
        let predictions = label_detections(&raw, detector.labels())?;

        let mut canvas = prepared.canvas;
        self.renderer.draw(&mut canvas, &predictions);
        let image = encode_jpeg_base64(&canvas).context("Failed to encode annotated image")?;

        tracing::info!(
            category = %category,
            detections = predictions.len(),
            "Prediction complete"
        );

        Ok(PredictResponse { predictions, image })
    }
}

/// Resolves class labels and truncates box coordinates to integers.
pub fn label_detections(
    detections: &[RawDetection],
    labels: &ClassNames,
) -> anyhow::Result<Vec<Prediction>> {
    detections
        .iter()
        .map(|det| {
            let class_name = labels
                .get(det.class_id)
                .with_context(|| format!("Model produced unknown class index {}", det.class_id))?;

            Ok(Prediction {
                class_name: class_name.to_string(),
                confidence: det.confidence,
                bbox: det.bbox.map(|v| v as i32),
            })
        })
        .collect()
}
