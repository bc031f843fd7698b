use ndarray::{Array, IxDyn};
use std::path::Path;
use std::str::FromStr;

#[cfg(feature = "ort-backend")]
pub mod ort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            )),
        }
    }
}

/// Session settings shared by every model a loader builds.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 4,
        }
    }
}

/// Tensor-level seam to the inference engine.
pub trait InferenceBackend {
    fn load_model(path: &Path, options: &BackendOptions) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a `[1, 3, H, W]` input
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Custom metadata stored with the model, if the format carries any.
    fn metadata(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

pub struct InferenceOutput {
    /// First output tensor, either `[1, 4 + nc, anchors]` or `[1, max_det, 6]`
    pub predictions: ndarray::ArrayD<f32>,
}
