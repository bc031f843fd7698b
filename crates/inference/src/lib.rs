pub mod backend;
pub mod config;
pub mod detector;
pub mod labels;
pub mod loader;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{BackendOptions, ExecutionProvider, InferenceBackend, InferenceOutput};
pub use config::InferenceConfig;
pub use detector::{Detector, RawDetection, YoloDetector};
pub use labels::{ClassNames, LabelError};
pub use loader::{CachingModelLoader, Category, FsModelLoader, LoadError, ModelLoader};
pub use processing::post::PostProcessor;
