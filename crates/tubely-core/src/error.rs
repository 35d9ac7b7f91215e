//! Error types module
//!
//! Every failure of an ingestion request is an `IngestError`. None of them are
//! retried: each one is terminal for the request that produced it. The `Display`
//! text carries internal detail for logs, while `ErrorMetadata::client_message`
//! is the generic text handed back to callers.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for caller-caused failures worth noticing
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PROBE_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Upload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Metadata lookup failed: {0}")]
    MetadataLookup(String),

    #[error("Temporary file error: {0}")]
    TempFile(#[source] io::Error),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Remux failed: {0}")]
    Remux(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Metadata update failed: {0}")]
    MetadataUpdate(String),
}

impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        IngestError::TempFile(err)
    }
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
fn ingest_error_static_metadata(err: &IngestError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        IngestError::InvalidContentType(_) => (400, "INVALID_CONTENT_TYPE", false, LogLevel::Debug),
        IngestError::PayloadTooLarge { .. } => (413, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        IngestError::VideoNotFound(_) => (404, "VIDEO_NOT_FOUND", false, LogLevel::Debug),
        IngestError::MetadataLookup(_) => (500, "METADATA_LOOKUP_FAILED", true, LogLevel::Error),
        IngestError::TempFile(_) => (500, "TEMP_FILE_ERROR", true, LogLevel::Error),
        IngestError::Probe(_) => (500, "PROBE_FAILED", true, LogLevel::Warn),
        IngestError::Remux(_) => (500, "REMUX_FAILED", true, LogLevel::Error),
        IngestError::KeyDerivation(_) => (500, "KEY_DERIVATION_FAILED", true, LogLevel::Error),
        IngestError::Upload(_) => (500, "UPLOAD_FAILED", true, LogLevel::Error),
        IngestError::MetadataUpdate(_) => (500, "METADATA_UPDATE_FAILED", true, LogLevel::Error),
    }
}

impl IngestError {
    /// Pipeline stage that produced the error, for diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::InvalidContentType(_)
            | IngestError::PayloadTooLarge { .. }
            | IngestError::VideoNotFound(_)
            | IngestError::MetadataLookup(_) => "validate",
            IngestError::TempFile(_) => "buffer",
            IngestError::Probe(_) => "probe",
            IngestError::Remux(_) => "remux",
            IngestError::KeyDerivation(_) => "derive_key",
            IngestError::Upload(_) => "upload",
            IngestError::MetadataUpdate(_) => "update_metadata",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl ErrorMetadata for IngestError {
    fn http_status_code(&self) -> u16 {
        ingest_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        ingest_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn is_sensitive(&self) -> bool {
        ingest_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        ingest_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            IngestError::InvalidContentType(_) => "Invalid file type".to_string(),
            IngestError::PayloadTooLarge { limit, .. } => {
                format!("File too large (limit is {} bytes)", limit)
            }
            IngestError::VideoNotFound(_) | IngestError::MetadataLookup(_) => {
                "Unable to get video".to_string()
            }
            IngestError::TempFile(_) => "Failed to buffer upload".to_string(),
            IngestError::Probe(_) => "Failed to read video metadata".to_string(),
            IngestError::Remux(_) => "Failed to optimize video".to_string(),
            IngestError::KeyDerivation(_) => "Failed to generate file name".to_string(),
            IngestError::Upload(_) => "Error uploading file".to_string(),
            IngestError::MetadataUpdate(_) => "Failed to update video".to_string(),
        }
    }
}
