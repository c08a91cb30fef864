//! Storage facade over Google Cloud Storage using Apache OpenDAL.
//!
//! This module provides simplified object storage operations:
//! - Upload from memory or from a local file
//! - Download into memory or onto disk
//! - Listing with prefix, delimiter and pagination
//! - Metadata and buffer accessors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        StorageClient                             │
//! │        (bucket resolution, request normalization, shaping)       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ ObjectStore::bucket(name)  │ BucketHandle::save / upload        │
//! │                            │ BucketHandle::download / metadata  │
//! │                            │ BucketHandle::list                 │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │  OpendalStore (GCS, fs)      │  InMemoryStore (tests, dev)      │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```

mod backend;
mod client;
mod codec;
mod error;
mod memory;
mod operator;
mod types;

pub use backend::{BucketHandle, DEFAULT_PAGE_SIZE, ListQuery, ObjectStore, WriteOptions};
pub use client::StorageClient;
pub use error::StorageError;
pub use gcs_easy_shared::config::{
    BackendProvider, ClientConfig, CredentialSource, ServiceAccountCredentials,
};
pub use memory::InMemoryStore;
pub use operator::OpendalStore;
pub use types::{
    DownloadPayload, DownloadRequest, DownloadResult, GetRequest, ListRequest, ListedObject,
    MetadataResult, ObjectMetadata, UploadData, UploadRequest, UploadResult, UserMetadata,
};
