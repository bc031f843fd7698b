use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::response::PredictResponse;
use crate::state::AppState;
use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartRejection},
    routing::{get, post},
};
use inference::Category;
use serde_json::{Value, json};
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Multipart field the upload is read from.
const FILE_FIELD: &str = "file";

pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/predict/:animal_type", post(predict))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(config: &GatewayConfig, state: AppState) -> anyhow::Result<()> {
    let app = router(state, config.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    tracing::info!("HTTP server listening on {}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[tracing::instrument(skip_all, fields(animal_type = %animal_type))]
async fn predict(
    State(state): State<AppState>,
    Path(animal_type): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let started = Instant::now();
    let category = animal_type.parse::<Category>().ok();

    let result = match category {
        Some(category) => handle_predict(&state, category, multipart).await,
        None => Err(ApiError::InvalidAnimalType),
    };

    let (status, detections) = match &result {
        Ok(response) => (axum::http::StatusCode::OK, response.predictions.len()),
        Err(e) => (e.status(), 0),
    };
    state.metrics.record(
        category.map_or("invalid", |c| c.as_str()),
        status,
        started.elapsed(),
        detections,
    );

    result.map(Json)
}

async fn handle_predict(
    state: &AppState,
    category: Category,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictResponse, ApiError> {
    let upload = read_upload(multipart).await?;
    tracing::debug!(bytes = upload.len(), "Received upload");

    let loader = state.loader.clone();
    let pipeline = state.pipeline.clone();
    let span = tracing::Span::current();

    let response = tokio::task::spawn_blocking(move || {
        span.in_scope(|| pipeline.run(loader.as_ref(), category, &upload))
    })
    .await
    .context("Prediction task failed")??;

    Ok(response)
}

/// First `file` field that carries a filename.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Bytes, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "Request body is not multipart");
        ApiError::NoFilePart
    })?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        match field.file_name().map(str::is_empty) {
            None => continue,
            Some(true) => return Err(ApiError::NoSelectedFile),
            Some(false) => return Ok(field.bytes().await?),
        }
    }

    Err(ApiError::NoFilePart)
}
