use crate::backend::InferenceBackend;
use crate::labels::ClassNames;
use crate::processing::post::PostProcessor;
use image::RgbImage;
use preprocess::to_input_tensor;
use std::sync::Mutex;

/// One detection in model-input pixel space, before label resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
}

/// Image-level seam: a loaded model bound to its class labels.
pub trait Detector: Send + Sync {
    /// Detections for a single RGB image already sized to the model input.
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>>;

    fn labels(&self) -> &ClassNames;
}

/// YOLO detector over any tensor backend. Inference calls are serialized
/// because a session needs exclusive access to run.
pub struct YoloDetector<B> {
    backend: Mutex<B>,
    labels: ClassNames,
    post: PostProcessor,
}

impl<B: InferenceBackend> YoloDetector<B> {
    pub fn new(backend: B, labels: ClassNames, post: PostProcessor) -> Self {
        Self {
            backend: Mutex::new(backend),
            labels,
            post,
        }
    }
}

impl<B: InferenceBackend + Send> Detector for YoloDetector<B> {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>> {
        let input = to_input_tensor(image)?;

        let output = {
            let _span = common::span!("inference");
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow::anyhow!("Inference backend lock poisoned"))?;
            backend.infer(&input)?
        };

        let _span = common::span_debug!("postprocess");
        let detections = self.post.parse_detections(&output.predictions.view())?;
        tracing::debug!(count = detections.len(), "Parsed detections");
        Ok(detections)
    }

    fn labels(&self) -> &ClassNames {
        &self.labels
    }
}
