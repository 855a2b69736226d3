//! Storage models.

use time::OffsetDateTime;

/// Entry metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Validated key
    pub key: String,
    /// Stored value size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl EntryInfo {
    pub fn new(key: impl Into<String>, size: u64, modified: OffsetDateTime) -> Self {
        Self { key: key.into(), size, modified }
    }
}
