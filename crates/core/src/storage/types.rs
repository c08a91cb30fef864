//! Request and result records for the storage facade.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// User-defined object metadata.
///
/// Kept apart from the backend-managed fields of [`ObjectMetadata`] so that
/// user keys can never overwrite values like the ETag or content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserMetadata(BTreeMap<String, String>);

impl UserMetadata {
    /// Create empty user metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UserMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for UserMetadata {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// In-memory upload content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadData {
    /// Raw bytes.
    Bytes(Bytes),
    /// Text, stored as UTF-8.
    Text(String),
}

impl UploadData {
    /// Convert to the bytes that will be stored.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => Bytes::from(text),
        }
    }
}

impl From<Bytes> for UploadData {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for UploadData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for UploadData {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for UploadData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for UploadData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Where upload content comes from, once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UploadSource {
    Data(Bytes),
    File(PathBuf),
}

/// Request to upload an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Bucket name (falls back to the client default).
    pub bucket: Option<String>,
    /// Destination key inside the bucket, e.g. `folder/report.pdf`.
    pub destination: String,
    /// In-memory content.
    pub data: Option<UploadData>,
    /// Local file to upload instead of `data`.
    pub file_path: Option<PathBuf>,
    /// Content type, e.g. `application/pdf`.
    pub content_type: Option<String>,
    /// Gzip the content before storing it.
    pub gzip: bool,
    /// Use resumable (chunked) transfer.
    pub resumable: bool,
    /// Make the object publicly readable.
    pub make_public: bool,
    /// User metadata attached to the object.
    pub metadata: UserMetadata,
}

impl UploadRequest {
    /// Create an upload request for `destination` with default options.
    #[must_use]
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            bucket: None,
            destination: destination.into(),
            data: None,
            file_path: None,
            content_type: None,
            gzip: false,
            resumable: true,
            make_public: false,
            metadata: UserMetadata::new(),
        }
    }

    /// Set the bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Upload in-memory content.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<UploadData>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Upload a local file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Enable or disable gzip.
    #[must_use]
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Enable or disable resumable transfer.
    #[must_use]
    pub fn with_resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }

    /// Make the object public.
    #[must_use]
    pub fn with_make_public(mut self, make_public: bool) -> Self {
        self.make_public = make_public;
        self
    }

    /// Add one user metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Validate that exactly one content source is set.
    ///
    /// An empty file path counts as absent. Empty data is valid content.
    pub(crate) fn take_source(&mut self) -> Result<UploadSource, super::StorageError> {
        let file_path = self
            .file_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());

        match (self.data.take(), file_path) {
            (Some(data), None) => Ok(UploadSource::Data(data.into_bytes())),
            (None, Some(path)) => Ok(UploadSource::File(path)),
            (None, None) => Err(super::StorageError::InvalidUploadSource),
            (Some(_), Some(_)) => Err(super::StorageError::AmbiguousUploadSource),
        }
    }
}

/// Request to download an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Bucket name (falls back to the client default).
    pub bucket: Option<String>,
    /// Source key inside the bucket.
    pub source: String,
    /// Save to this local path instead of returning bytes.
    pub destination_file_path: Option<PathBuf>,
}

impl DownloadRequest {
    /// Create a download request for `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            bucket: None,
            source: source.into(),
            destination_file_path: None,
        }
    }

    /// Set the bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Save the object to a local path.
    #[must_use]
    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination_file_path = Some(path.into());
        self
    }
}

fn default_auto_paginate() -> bool {
    true
}

/// Request to list objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListRequest {
    /// Bucket name (falls back to the client default).
    #[serde(default)]
    pub bucket: Option<String>,
    /// Only keys starting with this prefix, e.g. `folder/sub/`.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Folder separator, usually `/`.
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Objects per backend page.
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Follow pages until the end; `false` returns the first page only.
    #[serde(default = "default_auto_paginate")]
    pub auto_paginate: bool,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: None,
            delimiter: None,
            page_size: None,
            auto_paginate: default_auto_paginate(),
        }
    }
}

impl ListRequest {
    /// List everything in the default bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Enable or disable automatic pagination.
    #[must_use]
    pub fn with_auto_paginate(mut self, auto_paginate: bool) -> Self {
        self.auto_paginate = auto_paginate;
        self
    }
}

/// Request for a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    /// Bucket name (falls back to the client default).
    pub bucket: Option<String>,
    /// Object key.
    pub key: String,
}

impl GetRequest {
    /// Create a request for `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            bucket: None,
            key: key.into(),
        }
    }

    /// Set the bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }
}

/// Backend-managed object metadata plus user metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectMetadata {
    /// Object key.
    pub name: String,
    /// Bucket name.
    pub bucket: String,
    /// Stored size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Content encoding, `gzip` for compressed uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// ETag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Last update time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    /// Direct download link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,
    /// Whether the object is publicly readable, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_read: Option<bool>,
    /// User metadata.
    pub user_metadata: UserMetadata,
}

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Bucket the object was written to.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Direct download link.
    pub media_link: Option<String>,
    /// ETag after the upload.
    pub etag: Option<String>,
}

/// Downloaded content, either in memory or saved to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPayload {
    /// Object content.
    Data(Bytes),
    /// Local path the object was saved to.
    File(PathBuf),
}

/// Result of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Bucket the object was read from.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Downloaded content.
    pub payload: DownloadPayload,
}

impl DownloadResult {
    /// Content, when downloaded into memory.
    #[must_use]
    pub fn data(&self) -> Option<&Bytes> {
        match &self.payload {
            DownloadPayload::Data(data) => Some(data),
            DownloadPayload::File(_) => None,
        }
    }

    /// Local path, when saved to disk.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        match &self.payload {
            DownloadPayload::Data(_) => None,
            DownloadPayload::File(path) => Some(path),
        }
    }
}

/// One object from a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedObject {
    /// Object key.
    pub name: String,
    /// Stored size in bytes.
    pub size: Option<u64>,
    /// Content type.
    pub content_type: Option<String>,
    /// Last update time.
    pub updated: Option<String>,
    /// ETag.
    pub etag: Option<String>,
}

impl From<ObjectMetadata> for ListedObject {
    fn from(meta: ObjectMetadata) -> Self {
        Self {
            name: meta.name,
            size: meta.size,
            content_type: meta.content_type,
            updated: meta.updated,
            etag: meta.etag,
        }
    }
}

/// Result of a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataResult {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Object metadata.
    pub metadata: ObjectMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_upload_request_defaults() {
        let req = UploadRequest::new("x.txt");
        assert!(!req.gzip);
        assert!(req.resumable);
        assert!(!req.make_public);
        assert!(req.metadata.is_empty());
        assert!(req.bucket.is_none());
    }

    #[test]
    fn test_text_is_utf8_encoded() {
        let data = UploadData::from("héllo");
        assert_eq!(data.into_bytes(), Bytes::from("héllo".as_bytes().to_vec()));
    }

    #[test]
    fn test_take_source_requires_exactly_one() {
        let mut neither = UploadRequest::new("k");
        assert!(matches!(
            neither.take_source(),
            Err(StorageError::InvalidUploadSource)
        ));

        let mut both = UploadRequest::new("k")
            .with_data("hello")
            .with_file("/tmp/hello.txt");
        assert!(matches!(
            both.take_source(),
            Err(StorageError::AmbiguousUploadSource)
        ));

        let mut data = UploadRequest::new("k").with_data("hello");
        assert_eq!(
            data.take_source().expect("data source"),
            UploadSource::Data(Bytes::from_static(b"hello"))
        );

        let mut file = UploadRequest::new("k").with_file("/tmp/hello.txt");
        assert_eq!(
            file.take_source().expect("file source"),
            UploadSource::File(PathBuf::from("/tmp/hello.txt"))
        );
    }

    #[test]
    fn test_empty_file_path_counts_as_absent() {
        let mut req = UploadRequest::new("k").with_file("");
        assert!(matches!(
            req.take_source(),
            Err(StorageError::InvalidUploadSource)
        ));

        let mut req = UploadRequest::new("k").with_data("").with_file("");
        assert_eq!(
            req.take_source().expect("empty data is content"),
            UploadSource::Data(Bytes::new())
        );
    }

    #[test]
    fn test_list_request_deserialize_defaults() {
        let req: ListRequest = serde_json::from_str("{}").expect("empty list request");
        assert_eq!(req, ListRequest::default());
        assert!(req.auto_paginate);

        let req: ListRequest =
            serde_json::from_str(r#"{"prefix":"folder/","page_size":10,"auto_paginate":false}"#)
                .expect("list request");
        assert_eq!(req.prefix.as_deref(), Some("folder/"));
        assert_eq!(req.page_size, Some(10));
        assert!(!req.auto_paginate);
    }

    #[test]
    fn test_user_metadata_serializes_flat() {
        let meta: UserMetadata = [("owner", "ana"), ("team", "ops")].into_iter().collect();
        let json = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(json, serde_json::json!({"owner": "ana", "team": "ops"}));
        assert_eq!(meta.get("owner"), Some("ana"));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_download_result_accessors() {
        let in_memory = DownloadResult {
            bucket: "b1".to_string(),
            key: "x.txt".to_string(),
            payload: DownloadPayload::Data(Bytes::from_static(b"hello")),
        };
        assert_eq!(in_memory.data(), Some(&Bytes::from_static(b"hello")));
        assert!(in_memory.file_path().is_none());

        let on_disk = DownloadResult {
            payload: DownloadPayload::File(PathBuf::from("/tmp/x.txt")),
            ..in_memory
        };
        assert!(on_disk.data().is_none());
        assert_eq!(on_disk.file_path(), Some(Path::new("/tmp/x.txt")));
    }

    #[test]
    fn test_listed_object_from_metadata() {
        let meta = ObjectMetadata {
            name: "folder/a.txt".to_string(),
            bucket: "b1".to_string(),
            size: Some(5),
            content_type: Some("text/plain".to_string()),
            etag: Some("abc".to_string()),
            ..ObjectMetadata::default()
        };
        let listed = ListedObject::from(meta);
        assert_eq!(listed.name, "folder/a.txt");
        assert_eq!(listed.size, Some(5));
        assert_eq!(listed.etag.as_deref(), Some("abc"));
        assert!(listed.updated.is_none());
    }
}
