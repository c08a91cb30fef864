//! Process-local object store.
//!
//! Behaves like a bucket service for tests and local development: objects
//! keep their content type, encoding, ETag, ACL and user metadata, and
//! listings are served page by page in lexical key order.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::backend::{BucketHandle, ListQuery, ObjectStore, WriteOptions};
use super::codec::{self, GZIP_ENCODING};
use super::error::StorageError;
use super::types::{ObjectMetadata, UserMetadata};

/// In-memory object store. Buckets are created on first use.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: DashMap<String, Arc<MemoryBucket>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for InMemoryStore {
    fn bucket(&self, name: &str) -> Result<Arc<dyn BucketHandle>, StorageError> {
        let bucket: Arc<dyn BucketHandle> = self
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::new(name)))
            .clone();
        Ok(bucket)
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    content_encoding: Option<String>,
    etag: String,
    updated: String,
    public_read: bool,
    user_metadata: UserMetadata,
}

#[derive(Debug)]
struct MemoryBucket {
    name: String,
    objects: DashMap<String, StoredObject>,
}

/// One page of keys and the cursor for the next page.
struct KeyPage {
    keys: Vec<String>,
    next: Option<String>,
}

impl MemoryBucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: DashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found(&self.name, key))
    }

    fn page(&self, query: &ListQuery, start_after: Option<&str>) -> KeyPage {
        let page_size = query.page_size();
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| query.matches(key))
            .filter(|key| start_after.is_none_or(|cursor| key.as_str() > cursor))
            .collect();
        keys.sort();

        let next = if keys.len() > page_size {
            keys.truncate(page_size);
            keys.last().cloned()
        } else {
            None
        };

        KeyPage { keys, next }
    }
}

#[async_trait]
impl BucketHandle for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn save(
        &self,
        key: &str,
        data: Bytes,
        options: &WriteOptions,
    ) -> Result<(), StorageError> {
        let (data, content_encoding) = if options.gzip {
            (
                Bytes::from(codec::gzip(&data)?),
                Some(GZIP_ENCODING.to_string()),
            )
        } else {
            (data, None)
        };

        let object = StoredObject {
            etag: format!("{:x}", Sha256::digest(&data)),
            data,
            content_type: options.content_type.clone(),
            content_encoding,
            updated: Utc::now().to_rfc3339(),
            public_read: options.public_read,
            user_metadata: options.metadata.clone(),
        };

        debug!(
            bucket = %self.name,
            key = %key,
            size = object.data.len(),
            "Stored object in memory"
        );
        self.objects.insert(key.to_string(), object);
        Ok(())
    }

    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        options: &WriteOptions,
    ) -> Result<(), StorageError> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StorageError::io(local_path, e))?;
        self.save(key, Bytes::from(data), options).await
    }

    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let object = self.get(key)?;
        match object.content_encoding.as_deref() {
            Some(GZIP_ENCODING) => Ok(Bytes::from(codec::gunzip(&object.data)?)),
            _ => Ok(object.data),
        }
    }

    async fn download_to(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        let data = self.download(key).await?;
        tokio::fs::write(local_path, &data)
            .await
            .map_err(|e| StorageError::io(local_path, e))
    }

    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let object = self.get(key)?;
        Ok(ObjectMetadata {
            name: key.to_string(),
            bucket: self.name.clone(),
            size: Some(u64::try_from(object.data.len()).unwrap_or(u64::MAX)),
            content_type: object.content_type,
            content_encoding: object.content_encoding,
            etag: Some(object.etag),
            updated: Some(object.updated),
            media_link: Some(format!("memory://{}/{key}", self.name)),
            public_read: Some(object.public_read),
            user_metadata: object.user_metadata,
        })
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.page(query, cursor.as_deref());
            keys.extend(page.keys);
            match page.next {
                Some(next) if query.auto_paginate => cursor = Some(next),
                _ => break,
            }
        }

        Ok(keys)
    }
}
