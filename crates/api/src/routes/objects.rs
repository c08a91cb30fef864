//! Object routes: upload, download, listing and metadata.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use gcs_easy_core::storage::{
    GetRequest, ListRequest, ListedObject, MetadataResult, UploadRequest, UploadResult,
};
use serde::Deserialize;
use tracing::debug;

use crate::{AppState, error::ApiError, service::StorageService};

/// Header prefix carrying user metadata on uploads.
const USER_METADATA_PREFIX: &str = "x-goog-meta-";

/// Content type for objects stored without one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Creates the object routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/objects", get(list_objects))
        .route("/objects/{*key}", get(download_object).put(upload_object))
        .route("/metadata/{*key}", get(object_metadata))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for single-object routes.
#[derive(Debug, Default, Deserialize)]
pub struct BucketQuery {
    /// Bucket name (falls back to the default bucket).
    pub bucket: Option<String>,
}

fn default_resumable() -> bool {
    true
}

/// Query parameters for uploads.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Bucket name (falls back to the default bucket).
    pub bucket: Option<String>,
    /// Content type; the `Content-Type` header is used when absent.
    pub content_type: Option<String>,
    /// Gzip the body before storing it.
    #[serde(default)]
    pub gzip: bool,
    /// Use resumable transfer.
    #[serde(default = "default_resumable")]
    pub resumable: bool,
    /// Make the object publicly readable.
    #[serde(default)]
    pub make_public: bool,
}

impl UploadQuery {
    fn into_request(self, key: String, headers: &HeaderMap, body: Bytes) -> UploadRequest {
        let content_type = self.content_type.or_else(|| {
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        });

        let mut req = UploadRequest::new(key)
            .with_data(body)
            .with_gzip(self.gzip)
            .with_resumable(self.resumable)
            .with_make_public(self.make_public);
        req.bucket = self.bucket;
        req.content_type = content_type;
        req.metadata = user_metadata(headers).collect();
        req
    }
}

/// User metadata entries from `x-goog-meta-*` headers.
fn user_metadata(headers: &HeaderMap) -> impl Iterator<Item = (String, String)> + '_ {
    headers.iter().filter_map(|(name, value)| {
        let key = name.as_str().strip_prefix(USER_METADATA_PREFIX)?;
        let value = value.to_str().ok()?;
        (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/objects`
async fn list_objects(
    State(service): State<StorageService>,
    Query(req): Query<ListRequest>,
) -> Result<Json<Vec<ListedObject>>, ApiError> {
    let objects = service.list(req).await?;
    Ok(Json(objects))
}

/// PUT `/objects/{*key}`
async fn upload_object(
    State(service): State<StorageService>,
    Path(key): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResult>), ApiError> {
    debug!(key = %key, size = body.len(), "Upload received");
    let result = service
        .upload(query.into_request(key, &headers, body))
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET `/objects/{*key}`
///
/// Answers with the stored content type, `application/octet-stream` when none.
async fn download_object(
    State(service): State<StorageService>,
    Path(key): Path<String>,
    Query(query): Query<BucketQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let req = get_request(key, query);
    let content_type = service
        .get_metadata(req.clone())
        .await?
        .metadata
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let data = service.get_buffer(req).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

/// GET `/metadata/{*key}`
async fn object_metadata(
    State(service): State<StorageService>,
    Path(key): Path<String>,
    Query(query): Query<BucketQuery>,
) -> Result<Json<MetadataResult>, ApiError> {
    let result = service.get_metadata(get_request(key, query)).await?;
    Ok(Json(result))
}

fn get_request(key: String, query: BucketQuery) -> GetRequest {
    GetRequest {
        bucket: query.bucket,
        key,
    }
}
