//! Storage client facade.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;
use tracing::{debug, info};

use gcs_easy_shared::config::{BackendProvider, ClientConfig};

use super::backend::{BucketHandle, ListQuery, ObjectStore, WriteOptions};
use super::error::StorageError;
use super::memory::InMemoryStore;
use super::operator::OpendalStore;
use super::types::{
    DownloadPayload, DownloadRequest, DownloadResult, GetRequest, ListRequest, ListedObject,
    MetadataResult, UploadRequest, UploadResult, UploadSource,
};

/// Simplified object storage client.
///
/// Every call resolves its bucket (explicit name, else the configured
/// default), forwards to the object store and shapes the result. The client
/// holds no mutable state and can be shared across tasks behind an `Arc`.
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    config: ClientConfig,
}

impl StorageClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the object store cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self, StorageError> {
        let store: Arc<dyn ObjectStore> = match &config.backend {
            BackendProvider::Memory => Arc::new(InMemoryStore::new()),
            BackendProvider::Gcs { .. } | BackendProvider::LocalFs { .. } => {
                Arc::new(OpendalStore::from_config(&config)?)
            }
        };

        info!(
            provider = config.backend.name(),
            default_bucket = config.default_bucket().unwrap_or("-"),
            "Storage client created"
        );

        Ok(Self::with_store(store, config))
    }

    /// Create a client over an existing object store.
    #[must_use]
    pub fn with_store(store: Arc<dyn ObjectStore>, config: ClientConfig) -> Self {
        Self { store, config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the default bucket, if configured.
    #[must_use]
    pub fn default_bucket(&self) -> Option<&str> {
        self.config.default_bucket()
    }

    /// Pick the explicit bucket if non-empty, else the default.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingBucket`] when neither is set.
    pub fn resolve_bucket(
        &self,
        explicit: Option<&str>,
    ) -> Result<Arc<dyn BucketHandle>, StorageError> {
        let name = explicit
            .filter(|name| !name.is_empty())
            .or_else(|| self.default_bucket())
            .ok_or(StorageError::MissingBucket)?;
        self.store.bucket(name)
    }

    /// Upload an object from memory or from a local file.
    ///
    /// With `make_public`, the public-read grant is part of the write itself,
    /// so the object is never observable as private.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Neither or both of `data` and `file_path` are set
    /// - No bucket can be resolved
    /// - The backend rejects the write or the metadata re-read
    pub async fn upload(&self, mut req: UploadRequest) -> Result<UploadResult, StorageError> {
        let source = req.take_source()?;
        let bucket = self.resolve_bucket(req.bucket.as_deref())?;

        let options = WriteOptions {
            content_type: req.content_type.take(),
            gzip: req.gzip,
            resumable: req.resumable,
            public_read: req.make_public,
            metadata: std::mem::take(&mut req.metadata),
        };

        match source {
            UploadSource::Data(data) => {
                bucket.save(&req.destination, data, &options).await?;
            }
            UploadSource::File(path) => {
                bucket.upload(&path, &req.destination, &options).await?;
            }
        }

        let meta = bucket.metadata(&req.destination).await?;

        info!(
            bucket = %bucket.name(),
            key = %req.destination,
            public = options.public_read,
            "Object uploaded"
        );

        Ok(UploadResult {
            bucket: bucket.name().to_string(),
            key: req.destination,
            media_link: meta.media_link,
            etag: meta.etag,
        })
    }

    /// Download an object into memory, or onto disk when a destination is set.
    ///
    /// Parent directories of the destination are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if no bucket can be resolved, the object does not
    /// exist, or the local file cannot be written.
    pub async fn download(&self, req: DownloadRequest) -> Result<DownloadResult, StorageError> {
        let bucket = self.resolve_bucket(req.bucket.as_deref())?;

        let payload = match req.destination_file_path {
            Some(path) => {
                ensure_parent_dir(&path).await?;
                bucket.download_to(&req.source, &path).await?;
                debug!(bucket = %bucket.name(), key = %req.source, path = %path.display(), "Object saved to disk");
                DownloadPayload::File(path)
            }
            None => DownloadPayload::Data(bucket.download(&req.source).await?),
        };

        Ok(DownloadResult {
            bucket: bucket.name().to_string(),
            key: req.source,
            payload,
        })
    }

    /// List objects with prefix, delimiter and pagination.
    ///
    /// Metadata for the listed objects is fetched concurrently; the result
    /// keeps the listing order.
    ///
    /// # Errors
    ///
    /// Returns an error if no bucket can be resolved or the backend fails.
    /// An empty listing is not an error.
    pub async fn list(&self, req: ListRequest) -> Result<Vec<ListedObject>, StorageError> {
        let bucket = self.resolve_bucket(req.bucket.as_deref())?;

        let query = ListQuery {
            prefix: req.prefix,
            delimiter: req.delimiter,
            page_size: req.page_size,
            auto_paginate: req.auto_paginate,
        };

        let keys = bucket.list(&query).await?;
        let objects = try_join_all(keys.iter().map(|key| bucket.metadata(key))).await?;

        debug!(
            bucket = %bucket.name(),
            prefix = query.prefix(),
            count = objects.len(),
            "Objects listed"
        );

        Ok(objects.into_iter().map(ListedObject::from).collect())
    }

    /// Read an object's full content.
    ///
    /// # Errors
    ///
    /// Returns an error if no bucket can be resolved or the object does not exist.
    pub async fn get_buffer(&self, req: GetRequest) -> Result<Bytes, StorageError> {
        let bucket = self.resolve_bucket(req.bucket.as_deref())?;
        bucket.download(&req.key).await
    }

    /// Read an object's metadata without its content.
    ///
    /// # Errors
    ///
    /// Returns an error if no bucket can be resolved or the object does not exist.
    pub async fn get_metadata(&self, req: GetRequest) -> Result<MetadataResult, StorageError> {
        let bucket = self.resolve_bucket(req.bucket.as_deref())?;
        let metadata = bucket.metadata(&req.key).await?;

        Ok(MetadataResult {
            bucket: bucket.name().to_string(),
            key: req.key,
            metadata,
        })
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e)),
        _ => Ok(()),
    }
}
