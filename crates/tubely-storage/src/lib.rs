//! Tubely Storage Library
//!
//! This crate provides the storage abstraction used as the upload sink, with
//! implementations for S3 (through `object_store`) and the local filesystem.
//!
//! # Storage key format
//!
//! Keys are `{prefix}/{id}{extension}` for videos, where the prefix is the aspect
//! class folder (`landscape`, `portrait`, `other`), and `{id}{extension}` for
//! thumbnails. The id is 32 random bytes, URL-safe base64 without padding.
//! Keys must not contain `..` or a leading `/`. Key generation lives in the
//! `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_asset_storage, create_storage};
pub use keys::{generate_asset_id, media_type_extension, AssetKey};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
