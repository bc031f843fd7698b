use crate::metrics::RequestMetrics;
use crate::pipeline::Pipeline;
use inference::ModelLoader;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<dyn ModelLoader>,
    pub pipeline: Arc<Pipeline>,
    pub metrics: RequestMetrics,
}

impl AppState {
    pub fn new(loader: Arc<dyn ModelLoader>, pipeline: Pipeline) -> Self {
        Self {
            loader,
            pipeline: Arc::new(pipeline),
            metrics: RequestMetrics::new("gateway"),
        }
    }
}
