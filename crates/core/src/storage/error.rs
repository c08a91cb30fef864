//! Storage error types.

use std::path::{Path, PathBuf};

use gcs_easy_shared::AppError;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No bucket given and no default bucket configured.
    #[error("no bucket specified: set a default bucket on the client or pass one per call")]
    MissingBucket,

    /// Upload request carries neither in-memory data nor a file path.
    #[error("upload needs either `data` (bytes or text) or `file_path`")]
    InvalidUploadSource,

    /// Upload request carries both in-memory data and a file path.
    #[error("upload takes `data` or `file_path`, not both")]
    AmbiguousUploadSource,

    /// Object not found in storage.
    #[error("object not found: {bucket}/{key}")]
    NotFound {
        /// Bucket that was searched.
        bucket: String,
        /// Object key that was not found.
        key: String,
    },

    /// Local filesystem error.
    #[error("local file error at {}: {source}", path.display())]
    Io {
        /// Local path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Gzip encoding or decoding failed.
    #[error("gzip transcoding failed: {0}")]
    Compression(#[source] std::io::Error),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Requested behavior is not supported by the backend.
    #[error("unsupported by storage backend: {0}")]
    Unsupported(String),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Backend(#[source] opendal::Error),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a local file error.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an unsupported operation error.
    #[must_use]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Whether the error means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::MissingBucket
            | StorageError::InvalidUploadSource
            | StorageError::AmbiguousUploadSource => Self::Validation(message),
            StorageError::NotFound { .. } => Self::NotFound(message),
            StorageError::Unsupported(_) => Self::Unsupported(message),
            StorageError::Backend(e) if e.kind() == opendal::ErrorKind::PermissionDenied => {
                Self::Forbidden(message)
            }
            StorageError::Backend(_) => Self::ExternalService(message),
            StorageError::Io { .. }
            | StorageError::Compression(_)
            | StorageError::Configuration(_) => Self::Internal(message),
        }
    }
}
