//! Object store backed by Apache OpenDAL operators.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use dashmap::DashMap;
use futures::TryStreamExt;
use opendal::layers::LoggingLayer;
use opendal::{ErrorKind, Operator, Writer, services};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use gcs_easy_shared::config::{BackendProvider, ClientConfig, CredentialSource};

use super::backend::{BucketHandle, ListQuery, ObjectStore, WriteOptions};
use super::codec::{self, GZIP_ENCODING};
use super::error::StorageError;
use super::types::{ObjectMetadata, UserMetadata};

/// Public GCS endpoint, used for media links when no custom endpoint is set.
const GCS_DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Predefined ACL granting `allUsers` read access.
const PUBLIC_READ_ACL: &str = "publicRead";

/// Chunk size for resumable writes (GCS requires multiples of 256 KiB).
const RESUMABLE_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Read buffer for streaming local files.
const FILE_READ_BUFFER: usize = 256 * 1024;

/// Directory under the local root where in-flight writes are staged.
const LOCAL_STAGING_DIR: &str = ".staging";

/// Credentials in the shape the GCS service expects.
#[derive(Debug, Clone)]
enum GcsCredential {
    /// Base64-encoded service account JSON.
    Inline(String),
    /// Path to a service account key file.
    KeyFile(String),
    /// Application default credentials.
    Ambient,
}

/// Object store over OpenDAL: Google Cloud Storage or a local directory.
///
/// One operator per bucket is built on first use and kept for the store's
/// lifetime.
pub struct OpendalStore {
    provider: BackendProvider,
    credential: GcsCredential,
    buckets: DashMap<String, Arc<OpendalBucket>>,
}

impl OpendalStore {
    /// Create a store from client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is not served by OpenDAL or the
    /// credentials cannot be encoded.
    pub fn from_config(config: &ClientConfig) -> Result<Self, StorageError> {
        if matches!(config.backend, BackendProvider::Memory) {
            return Err(StorageError::configuration(
                "memory backend is served by InMemoryStore",
            ));
        }

        let credential = match config.credential_source() {
            CredentialSource::Inline(credentials) => GcsCredential::Inline(
                encode_service_account(
                    credentials.client_email.as_deref().unwrap_or_default(),
                    credentials.private_key.as_deref().unwrap_or_default(),
                    config.project_id.as_deref(),
                )?,
            ),
            CredentialSource::KeyFile(path) => GcsCredential::KeyFile(
                path.to_str()
                    .ok_or_else(|| StorageError::configuration("key file path is not valid UTF-8"))?
                    .to_string(),
            ),
            CredentialSource::Ambient => GcsCredential::Ambient,
        };

        info!(
            provider = config.backend.name(),
            credentials = credential.kind(),
            project_id = config.project_id.as_deref().unwrap_or("-"),
            "Object store configured"
        );

        Ok(Self {
            provider: config.backend.clone(),
            credential,
            buckets: DashMap::new(),
        })
    }

    fn build_bucket(&self, name: &str) -> Result<OpendalBucket, StorageError> {
        match &self.provider {
            BackendProvider::Gcs { endpoint } => {
                let operator = self.gcs_operator(name, endpoint.as_deref(), None)?;
                let public_operator =
                    self.gcs_operator(name, endpoint.as_deref(), Some(PUBLIC_READ_ACL))?;
                let base = endpoint
                    .as_deref()
                    .unwrap_or(GCS_DEFAULT_ENDPOINT)
                    .trim_end_matches('/');

                Ok(OpendalBucket {
                    name: name.to_string(),
                    operator,
                    public_operator: Some(public_operator),
                    media_link_base: Some(format!("{base}/download/storage/v1/b/{name}/o/")),
                    ordered_listing: true,
                })
            }
            BackendProvider::LocalFs { root } => {
                let dir = root.join(name);
                let staging = root.join(LOCAL_STAGING_DIR).join(name);
                let builder = services::Fs::default()
                    .root(path_str(&dir)?)
                    .atomic_write_dir(path_str(&staging)?);

                Ok(OpendalBucket {
                    name: name.to_string(),
                    operator: finish(builder)?,
                    public_operator: None,
                    media_link_base: None,
                    ordered_listing: false,
                })
            }
            BackendProvider::Memory => Err(StorageError::configuration(
                "memory backend is served by InMemoryStore",
            )),
        }
    }

    fn gcs_operator(
        &self,
        bucket: &str,
        endpoint: Option<&str>,
        predefined_acl: Option<&str>,
    ) -> Result<Operator, StorageError> {
        let mut builder = services::Gcs::default().bucket(bucket);

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }

        builder = match &self.credential {
            GcsCredential::Inline(encoded) => builder.credential(encoded),
            GcsCredential::KeyFile(path) => builder.credential_path(path),
            GcsCredential::Ambient => builder,
        };

        if let Some(acl) = predefined_acl {
            builder = builder.predefined_acl(acl);
        }

        finish(builder)
    }
}

impl ObjectStore for OpendalStore {
    fn bucket(&self, name: &str) -> Result<Arc<dyn BucketHandle>, StorageError> {
        if let Some(bucket) = self.buckets.get(name) {
            let bucket: Arc<dyn BucketHandle> = bucket.value().clone();
            return Ok(bucket);
        }

        let built = Arc::new(self.build_bucket(name)?);
        let bucket: Arc<dyn BucketHandle> = self
            .buckets
            .entry(name.to_string())
            .or_insert(built)
            .clone();
        Ok(bucket)
    }
}

impl GcsCredential {
    fn kind(&self) -> &'static str {
        match self {
            Self::Inline(_) => "inline",
            Self::KeyFile(_) => "key_file",
            Self::Ambient => "ambient",
        }
    }
}

/// Build the base64 service account document the GCS service accepts.
fn encode_service_account(
    client_email: &str,
    private_key: &str,
    project_id: Option<&str>,
) -> Result<String, StorageError> {
    let mut document = serde_json::json!({
        "type": "service_account",
        "client_email": client_email,
        "private_key": private_key,
    });
    if let Some(project_id) = project_id {
        document["project_id"] = serde_json::Value::String(project_id.to_string());
    }

    let raw = serde_json::to_vec(&document)
        .map_err(|e| StorageError::configuration(format!("invalid credentials: {e}")))?;
    Ok(STANDARD.encode(raw))
}

fn finish<B: opendal::Builder>(builder: B) -> Result<Operator, StorageError> {
    Ok(Operator::new(builder)
        .map_err(|e| StorageError::configuration(e.to_string()))?
        .layer(LoggingLayer::default())
        .finish())
}

fn path_str(path: &Path) -> Result<&str, StorageError> {
    path.to_str().ok_or_else(|| {
        StorageError::configuration(format!("path is not valid UTF-8: {}", path.display()))
    })
}

/// Percent-encode an object key for use in a media link.
fn encode_key(key: &str) -> String {
    url::form_urlencoded::byte_serialize(key.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

struct OpendalBucket {
    name: String,
    operator: Operator,
    /// Same bucket with a public-read predefined ACL on every write.
    public_operator: Option<Operator>,
    media_link_base: Option<String>,
    /// Whether the service lists keys in lexical order.
    ordered_listing: bool,
}

impl OpendalBucket {
    fn map_err(&self, key: &str, err: opendal::Error) -> StorageError {
        match err.kind() {
            ErrorKind::NotFound => StorageError::not_found(&self.name, key),
            _ => StorageError::Backend(err),
        }
    }

    fn write_operator(&self, options: &WriteOptions) -> Result<&Operator, StorageError> {
        if !options.public_read {
            return Ok(&self.operator);
        }
        self.public_operator.as_ref().ok_or_else(|| {
            StorageError::unsupported(format!(
                "bucket '{}' cannot grant public read access",
                self.name
            ))
        })
    }

    /// Open a writer with every option the service supports.
    async fn open_writer(
        &self,
        key: &str,
        options: &WriteOptions,
        content_encoding: Option<&str>,
    ) -> Result<Writer, StorageError> {
        let operator = self.write_operator(options)?;
        let capability = operator.info().full_capability();
        let mut writer = operator.writer_with(key);

        if let Some(content_type) = options.content_type.as_deref() {
            if capability.write_with_content_type {
                writer = writer.content_type(content_type);
            }
        }
        if let Some(content_encoding) = content_encoding {
            writer = writer.content_encoding(content_encoding);
        }
        if !options.metadata.is_empty() {
            if capability.write_with_user_metadata {
                writer = writer.user_metadata(options.metadata.clone());
            } else {
                debug!(bucket = %self.name, key = %key, "User metadata not supported, skipped");
            }
        }
        if options.resumable && capability.write_can_multi {
            writer = writer.chunk(RESUMABLE_CHUNK_SIZE);
        }

        writer.await.map_err(|e| self.map_err(key, e))
    }

    /// Abort an unfinished write so no partial object stays behind.
    async fn abort(&self, key: &str, mut writer: Writer, err: StorageError) -> StorageError {
        if let Err(abort_err) = writer.abort().await {
            debug!(bucket = %self.name, key = %key, error = %abort_err, "Failed to abort write");
        }
        err
    }

    /// Copy a local file into an open writer.
    async fn copy_file(
        &self,
        key: &str,
        local_path: &Path,
        writer: &mut Writer,
    ) -> Result<(), StorageError> {
        let mut file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| StorageError::io(local_path, e))?;
        let mut buf = vec![0u8; FILE_READ_BUFFER];

        loop {
            let read = file
                .read(&mut buf)
                .await
                .map_err(|e| StorageError::io(local_path, e))?;
            if read == 0 {
                return Ok(());
            }
            writer
                .write(Bytes::copy_from_slice(&buf[..read]))
                .await
                .map_err(|e| self.map_err(key, e))?;
        }
    }

    /// Stream an object into a local file.
    async fn copy_to_file(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        let reader = self
            .operator
            .reader(key)
            .await
            .map_err(|e| self.map_err(key, e))?;
        let stream = reader
            .into_bytes_stream(..)
            .await
            .map_err(|e| self.map_err(key, e))?;
        let mut stream = std::pin::pin!(stream);
        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| StorageError::io(local_path, e))?;

        while let Some(chunk) = stream.try_next().await.map_err(|e| {
            StorageError::Backend(
                opendal::Error::new(ErrorKind::Unexpected, "object read interrupted")
                    .set_source(e),
            )
        })? {
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::io(local_path, e))?;
        }

        file.flush()
            .await
            .map_err(|e| StorageError::io(local_path, e))
    }

    /// Compress when requested and the service can record the encoding.
    fn encode(
        &self,
        data: Bytes,
        options: &WriteOptions,
    ) -> Result<(Bytes, Option<&'static str>), StorageError> {
        if !options.gzip {
            return Ok((data, None));
        }
        let capability = self.write_operator(options)?.info().full_capability();
        if !capability.write_with_content_encoding {
            debug!(bucket = %self.name, "Content encoding not supported, storing uncompressed");
            return Ok((data, None));
        }
        Ok((Bytes::from(codec::gzip(&data)?), Some(GZIP_ENCODING)))
    }
}

#[async_trait]
impl BucketHandle for OpendalBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn save(
        &self,
        key: &str,
        data: Bytes,
        options: &WriteOptions,
    ) -> Result<(), StorageError> {
        let (data, content_encoding) = self.encode(data, options)?;
        let mut writer = self.open_writer(key, options, content_encoding).await?;
        if let Err(e) = writer.write(data).await {
            let err = self.map_err(key, e);
            return Err(self.abort(key, writer, err).await);
        }
        writer.close().await.map_err(|e| self.map_err(key, e))?;
        Ok(())
    }

    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        options: &WriteOptions,
    ) -> Result<(), StorageError> {
        if options.gzip {
            let data = tokio::fs::read(local_path)
                .await
                .map_err(|e| StorageError::io(local_path, e))?;
            return self.save(key, Bytes::from(data), options).await;
        }

        // Fail on a missing source before a write session is opened.
        tokio::fs::metadata(local_path)
            .await
            .map_err(|e| StorageError::io(local_path, e))?;

        let mut writer = self.open_writer(key, options, None).await?;
        if let Err(err) = self.copy_file(key, local_path, &mut writer).await {
            return Err(self.abort(key, writer, err).await);
        }
        writer.close().await.map_err(|e| self.map_err(key, e))?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self
            .operator
            .read(key)
            .await
            .map_err(|e| self.map_err(key, e))?;
        Ok(buffer.to_bytes())
    }

    async fn download_to(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        // Resolve not-found before touching the destination.
        self.operator
            .stat(key)
            .await
            .map_err(|e| self.map_err(key, e))?;

        let result = self.copy_to_file(key, local_path).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(local_path).await;
        }
        result
    }

    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let meta = self
            .operator
            .stat(key)
            .await
            .map_err(|e| self.map_err(key, e))?;

        Ok(ObjectMetadata {
            name: key.to_string(),
            bucket: self.name.clone(),
            size: Some(meta.content_length()),
            content_type: meta.content_type().map(String::from),
            content_encoding: meta.content_encoding().map(String::from),
            etag: meta.etag().map(String::from),
            updated: meta.last_modified().map(|t| t.to_string()),
            media_link: self
                .media_link_base
                .as_ref()
                .map(|base| format!("{base}{}?alt=media", encode_key(key))),
            public_read: None,
            user_metadata: meta
                .user_metadata()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_else(UserMetadata::new),
        })
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<String>, StorageError> {
        let prefix = query.prefix();
        let delimiter = query.delimiter();
        if delimiter.is_some_and(|d| d != "/") {
            return Err(StorageError::unsupported(
                "only '/' is supported as a listing delimiter",
            ));
        }

        // Listing works on directories; filter the parent directory by prefix.
        let dir = prefix.rfind('/').map_or("", |i| &prefix[..=i]);
        let limit = if query.auto_paginate {
            usize::MAX
        } else {
            query.page_size()
        };

        let mut lister = self
            .operator
            .lister_with(dir)
            .recursive(delimiter.is_none())
            .limit(query.page_size())
            .await
            .map_err(|e| self.map_err(dir, e))?;

        let mut keys = Vec::new();
        while let Some(entry) = lister.try_next().await.map_err(|e| self.map_err(dir, e))? {
            if entry.metadata().is_dir() || !query.matches(entry.path()) {
                continue;
            }
            keys.push(entry.path().to_string());
            // Unordered services must see every key before the first page is known.
            if self.ordered_listing && keys.len() >= limit {
                break;
            }
        }

        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }
}
