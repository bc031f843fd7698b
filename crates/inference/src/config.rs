use crate::backend::{BackendOptions, ExecutionProvider};
use crate::processing::post::PostProcessor;
use common::env_or;
use preprocess::INPUT_SIZE;
use std::path::PathBuf;

pub const MODEL_DIR_VAR: &str = "DETECTOR_MODEL_DIR";
pub const CONFIDENCE_THRESHOLD_VAR: &str = "DETECTOR_CONFIDENCE_THRESHOLD";
pub const IOU_THRESHOLD_VAR: &str = "DETECTOR_IOU_THRESHOLD";
pub const MAX_DETECTIONS_VAR: &str = "DETECTOR_MAX_DETECTIONS";
pub const EXECUTION_PROVIDER_VAR: &str = "DETECTOR_EXECUTION_PROVIDER";
pub const INTRA_THREADS_VAR: &str = "DETECTOR_INTRA_THREADS";

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_dir: PathBuf,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("."),
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 4,
        }
    }
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            model_dir: env_or(MODEL_DIR_VAR, defaults.model_dir),
            confidence_threshold: env_or(CONFIDENCE_THRESHOLD_VAR, defaults.confidence_threshold),
            iou_threshold: env_or(IOU_THRESHOLD_VAR, defaults.iou_threshold),
            max_detections: env_or(MAX_DETECTIONS_VAR, defaults.max_detections),
            execution_provider: env_or(EXECUTION_PROVIDER_VAR, defaults.execution_provider),
            intra_threads: env_or(INTRA_THREADS_VAR, defaults.intra_threads),
        }
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            execution_provider: self.execution_provider,
            intra_threads: self.intra_threads,
        }
    }

    pub fn post_processor(&self) -> PostProcessor {
        PostProcessor::new(
            self.confidence_threshold,
            self.iou_threshold,
            self.max_detections,
            INPUT_SIZE,
        )
    }
}
