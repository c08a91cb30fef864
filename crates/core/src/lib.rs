//! Object storage facade for gcs-easy.
//!
//! This crate contains the storage logic with ZERO web dependencies.
//! Callers get simplified upload, download, list and metadata operations
//! with default-bucket resolution on top of a pluggable object store.
//!
//! # Modules
//!
//! - `storage` - Facade, object store capability and its implementations

pub mod storage;
