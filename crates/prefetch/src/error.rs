//! Prefetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. None of these escape the scheduling
//! operations; they surface only from construction and explicit record
//! maintenance.

use derive_more::{Display, Error};

/// A prefetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for prefetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The request for a media resource failed before a response arrived.
    #[display("network error loading {_0}")]
    Network(#[error(not(source))] String),
    /// The media host answered with a non-success status.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// Reading or writing the persisted record failed.
    #[display("prefetch record storage error")]
    Storage,
    /// A persisted record could not be decoded.
    #[display("invalid prefetch record: {_0}")]
    InvalidRecord(#[error(not(source))] String),
    /// Configuration values that cannot work together.
    #[display("invalid prefetch configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Storage => true,
            Self::Status(code) => *code >= 500,
            Self::InvalidRecord(_) | Self::InvalidConfig(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Network("a.mp4".to_string()), true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(404), false)]
    #[case(ErrorKind::Storage, true)]
    #[case(ErrorKind::InvalidRecord("k".to_string()), false)]
    #[case(ErrorKind::InvalidConfig("x".to_string()), false)]
    fn test_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::Status(404).to_string(), "unexpected HTTP status 404");
        assert_eq!(ErrorKind::Network("a.mp4".to_string()).to_string(), "network error loading a.mp4");
    }
}
