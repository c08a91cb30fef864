//! Injectable storage service.

use std::sync::Arc;

use bytes::Bytes;
use gcs_easy_core::storage::{
    DownloadRequest, DownloadResult, GetRequest, ListRequest, ListedObject, MetadataResult,
    StorageClient, StorageError, UploadRequest, UploadResult,
};

/// Storage operations for request handlers.
///
/// Thin delegate over the shared [`StorageClient`]; cloning is cheap.
#[derive(Clone)]
pub struct StorageService {
    client: Arc<StorageClient>,
}

impl StorageService {
    /// Create a service over a shared client.
    #[must_use]
    pub fn new(client: Arc<StorageClient>) -> Self {
        Self { client }
    }

    /// Get the underlying client.
    #[must_use]
    pub fn client(&self) -> &Arc<StorageClient> {
        &self.client
    }

    /// See [`StorageClient::upload`].
    ///
    /// # Errors
    ///
    /// Returns the client's error unchanged.
    pub async fn upload(&self, req: UploadRequest) -> Result<UploadResult, StorageError> {
        self.client.upload(req).await
    }

    /// See [`StorageClient::download`].
    ///
    /// # Errors
    ///
    /// Returns the client's error unchanged.
    pub async fn download(&self, req: DownloadRequest) -> Result<DownloadResult, StorageError> {
        self.client.download(req).await
    }

    /// See [`StorageClient::list`].
    ///
    /// # Errors
    ///
    /// Returns the client's error unchanged.
    pub async fn list(&self, req: ListRequest) -> Result<Vec<ListedObject>, StorageError> {
        self.client.list(req).await
    }

    /// See [`StorageClient::get_buffer`].
    ///
    /// # Errors
    ///
    /// Returns the client's error unchanged.
    pub async fn get_buffer(&self, req: GetRequest) -> Result<Bytes, StorageError> {
        self.client.get_buffer(req).await
    }

    /// See [`StorageClient::get_metadata`].
    ///
    /// # Errors
    ///
    /// Returns the client's error unchanged.
    pub async fn get_metadata(&self, req: GetRequest) -> Result<MetadataResult, StorageError> {
        self.client.get_metadata(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcs_easy_core::storage::{BackendProvider, ClientConfig};

    #[tokio::test]
    async fn test_service_shares_client_state() {
        let client = StorageClient::new(
            ClientConfig::new()
                .with_default_bucket("b1")
                .with_backend(BackendProvider::Memory),
        )
        .expect("client");
        let service = StorageService::new(Arc::new(client));
        let other = service.clone();

        service
            .upload(UploadRequest::new("x.txt").with_data("hello"))
            .await
            .expect("upload");

        assert_eq!(
            other
                .get_buffer(GetRequest::new("x.txt"))
                .await
                .expect("buffer"),
            "hello"
        );
        assert!(Arc::ptr_eq(service.client(), other.client()));
    }
}
