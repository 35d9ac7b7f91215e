//! Tubely Core Library
//!
//! This crate provides the domain model, error types, configuration, and validation
//! helpers shared by the storage, processing, and CLI crates.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorMetadata, IngestError, LogLevel};
pub use models::Video;
pub use storage_types::StorageBackend;
