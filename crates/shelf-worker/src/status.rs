//! Status endpoint
//!
//! `GET /` reports the processed count as a sentence; `GET /health` reports
//! it as JSON. Both read the shared [`ProcessedCounter`] and never block
//! on ingestion.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::counter::ProcessedCounter;
use crate::error::AppError;

pub fn router(processed: ProcessedCounter) -> Router {
    Router::new()
        .route("/", get(processed_page))
        .route("/health", get(health_check))
        .fallback(not_found)
        .with_state(processed)
        .layer(tracing_layer())
}

/// Create tracing/logging layer
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Micros),
        )
}

async fn processed_page(State(processed): State<ProcessedCounter>) -> String {
    format!("This worker has processed {} books.", processed.get())
}

async fn health_check(State(processed): State<ProcessedCounter>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "processed": processed.get(),
        })),
    )
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
