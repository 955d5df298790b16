//! Error types and result aliases for Relic operations.
//!
//! Provides a unified error type that covers all error conditions across
//! the Relic crates with enough structure for callers to tell
//! "nothing to restore" from "store corrupted" from "not permitted".

use thiserror::Error;

/// Unified error type for all Relic operations
#[derive(Error, Debug)]
pub enum RelicError {
    // Lookup errors
    #[error("No stored artifact for {kind}:{input_key}")]
    EntryNotFound { kind: String, input_key: String },

    #[error("Blob {digest} not found in store")]
    BlobNotFound { digest: String },

    #[error("Ingest source missing: {path}")]
    SourceNotFound { path: String },

    // Argument errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // Integrity errors
    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Malformed index entry at {path}: {message}")]
    IndexCorrupt { path: String, message: String },

    // Boundary errors
    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    // Config errors
    #[error("Failed to parse {path}: {message}")]
    ConfigParse { path: String, message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Relic operations
pub type RelicResult<T> = Result<T, RelicError>;

impl RelicError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a permission-denied error
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Whether this error means the requested item simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RelicError::EntryNotFound { .. }
                | RelicError::BlobNotFound { .. }
                | RelicError::SourceNotFound { .. }
        )
    }
}
