//! Storage module wiring for the application router.

use std::sync::Arc;

use gcs_easy_core::storage::{ClientConfig, StorageClient, StorageError};
use tracing::info;

use crate::{AppState, service::StorageService};

/// Builds the storage client once and hands it to the router.
///
/// ```ignore
/// let module = StorageModule::for_root(config.storage)?;
/// let app = create_router(module.into_state());
/// ```
pub struct StorageModule {
    client: Arc<StorageClient>,
    service: StorageService,
}

impl StorageModule {
    /// Create the module from client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage client cannot be created.
    pub fn for_root(config: ClientConfig) -> Result<Self, StorageError> {
        let client = StorageClient::new(config)?;
        info!(
            default_bucket = client.default_bucket().unwrap_or("-"),
            "Storage module registered"
        );
        Ok(Self::from_client(client))
    }

    /// Create the module around an existing client.
    #[must_use]
    pub fn from_client(client: StorageClient) -> Self {
        let client = Arc::new(client);
        let service = StorageService::new(Arc::clone(&client));
        Self { client, service }
    }

    /// Get the shared client.
    #[must_use]
    pub fn client(&self) -> Arc<StorageClient> {
        Arc::clone(&self.client)
    }

    /// Get the injectable service.
    #[must_use]
    pub fn service(&self) -> StorageService {
        self.service.clone()
    }

    /// Convert into router state.
    #[must_use]
    pub fn into_state(self) -> AppState {
        AppState {
            storage: self.client,
            service: self.service,
        }
    }
}
