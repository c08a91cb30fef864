//! Health check endpoints.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use gcs_easy_core::storage::StorageClient;
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Storage provider name.
    pub provider: &'static str,
    /// Default bucket, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_bucket: Option<String>,
}

/// Health check handler.
async fn health_check(State(storage): State<Arc<StorageClient>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: storage.config().backend.name(),
        default_bucket: storage.default_bucket().map(String::from),
    })
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
