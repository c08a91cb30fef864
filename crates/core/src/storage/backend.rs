//! Object store capability consumed by the facade.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::StorageError;
use super::types::{ObjectMetadata, UserMetadata};

/// Backend page size when a listing does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Options applied when writing an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Content type.
    pub content_type: Option<String>,
    /// Gzip the content and record `gzip` content encoding.
    pub gzip: bool,
    /// Chunked (resumable) transfer.
    pub resumable: bool,
    /// Grant public read access as part of the write.
    pub public_read: bool,
    /// User metadata.
    pub metadata: UserMetadata,
}

/// Listing query passed to a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Key prefix.
    pub prefix: Option<String>,
    /// Folder separator; objects below a common prefix are left out.
    pub delimiter: Option<String>,
    /// Objects per page.
    pub page_size: Option<usize>,
    /// Follow all pages.
    pub auto_paginate: bool,
}

impl ListQuery {
    /// Effective page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Prefix, empty when unset.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// Delimiter, ignoring empty strings.
    #[must_use]
    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref().filter(|d| !d.is_empty())
    }

    /// Whether `key` is a leaf object for this query.
    ///
    /// Keys must start with the prefix. With a delimiter, keys that contain it
    /// after the prefix belong to a common prefix and are not leaves.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        let Some(rest) = key.strip_prefix(self.prefix()) else {
            return false;
        };
        match self.delimiter() {
            Some(delimiter) => !rest.contains(delimiter),
            None => true,
        }
    }
}

/// Source of bucket handles.
///
/// Authentication, transport and retries live behind this trait.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectStore: Send + Sync {
    /// Get a handle for the named bucket.
    fn bucket(&self, name: &str) -> Result<Arc<dyn BucketHandle>, StorageError>;
}

/// Operations on one bucket.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BucketHandle: Send + Sync {
    /// Bucket name.
    fn name(&self) -> &str;

    /// Write in-memory content to `key`.
    async fn save(&self, key: &str, data: Bytes, options: &WriteOptions)
    -> Result<(), StorageError>;

    /// Write a local file to `key`.
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        options: &WriteOptions,
    ) -> Result<(), StorageError>;

    /// Read the full content of `key`.
    async fn download(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Write the content of `key` to a local file.
    async fn download_to(&self, key: &str, local_path: &Path) -> Result<(), StorageError>;

    /// Read metadata only.
    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError>;

    /// Object keys matching the query, in lexical order.
    async fn list(&self, query: &ListQuery) -> Result<Vec<String>, StorageError>;
}
