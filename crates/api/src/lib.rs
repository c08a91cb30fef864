//! HTTP adapter for the storage facade.
//!
//! This crate provides:
//! - `StorageModule`, which builds one storage client for the application
//! - `StorageService`, the injectable pass-through used by handlers
//! - REST routes for objects, listings and metadata
//! - Error responses

pub mod error;
pub mod module;
pub mod routes;
pub mod service;

use std::sync::Arc;

use axum::{Router, extract::FromRef};
use gcs_easy_core::storage::StorageClient;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use module::StorageModule;
pub use service::StorageService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared storage client.
    pub storage: Arc<StorageClient>,
    /// Storage service over the same client.
    pub service: StorageService,
}

impl FromRef<AppState> for Arc<StorageClient> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.storage)
    }
}

impl FromRef<AppState> for StorageService {
    fn from_ref(state: &AppState) -> Self {
        state.service.clone()
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
