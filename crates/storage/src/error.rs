//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Key does not exist
    #[display("key not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied on the underlying directory
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Key is empty, too long, or contains characters outside the allowed set
    #[display("invalid key: {_0:?}")]
    InvalidKey(#[error(not(source))] String),
    /// Storage root is unusable (not absolute, not a directory)
    #[display("invalid storage root: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    /// Writing would exceed the configured byte quota
    #[display("quota exceeded writing {key}: {required} bytes needed, {limit} allowed")]
    QuotaExceeded {
        key: String,
        required: u64,
        limit: u64,
    },
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
