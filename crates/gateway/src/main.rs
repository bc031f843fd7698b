use common::{TelemetryGuard, setup_logging};
use gateway::{AppState, GatewayConfig, Pipeline, render::OverlayRenderer, run_server};
use inference::ModelLoader;
use preprocess::PreProcessor;
use std::sync::Arc;

const SERVICE_NAME: &str = "gateway";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env();

    let _telemetry = match TelemetryGuard::from_env(SERVICE_NAME, config.environment)? {
        Some(guard) => Some(guard),
        None => {
            setup_logging(config.environment);
            None
        }
    };

    tracing::info!(
        environment = config.environment.as_str(),
        model_dir = %config.inference.model_dir.display(),
        model_cache = config.model_cache,
        execution_provider = ?config.inference.execution_provider,
        "Detection service starting"
    );

    let loader = build_loader(&config)?;
    let pipeline = Pipeline::new(PreProcessor::default(), OverlayRenderer::new()?);
    let state = AppState::new(loader, pipeline);

    run_server(&config, state).await
}

#[cfg(feature = "ort-backend")]
fn build_loader(config: &GatewayConfig) -> anyhow::Result<Arc<dyn ModelLoader>> {
    use inference::{CachingModelLoader, FsModelLoader, backend::ort::OrtBackend};

    let loader = FsModelLoader::<OrtBackend>::new(
        config.inference.model_dir.clone(),
        config.inference.backend_options(),
        config.inference.post_processor(),
    );

    if config.model_cache {
        Ok(Arc::new(CachingModelLoader::new(loader)))
    } else {
        Ok(Arc::new(loader))
    }
}

#[cfg(not(feature = "ort-backend"))]
fn build_loader(_config: &GatewayConfig) -> anyhow::Result<Arc<dyn ModelLoader>> {
    anyhow::bail!("gateway was built without an inference backend; enable the `ort-backend` feature")
}
