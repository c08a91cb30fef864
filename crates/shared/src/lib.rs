//! Shared configuration and error types for gcs-easy.
//!
//! This crate provides the types every other crate agrees on:
//! - Storage client configuration and the credential precedence chain
//! - Server configuration and config-file/environment loading
//! - Application-wide error types

pub mod config;
pub mod error;

pub use config::{
    AppConfig, BackendProvider, ClientConfig, CredentialSource, ServerConfig,
    ServiceAccountCredentials,
};
pub use error::{AppError, AppResult};
