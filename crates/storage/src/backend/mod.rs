//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, a small key/value interface
//! modelled on browser `Storage` (`getItem`/`setItem`/`removeItem`), with an
//! in-memory backend for session scope, a directory-backed backend for
//! persistent scope, and a read-only wrapper for when storage is disabled.

mod local;
mod memory;
mod ro;

pub use self::local::LocalBackend;
pub use self::memory::MemoryBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::{ErrorKind, Result};
use crate::models::EntryInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

type EntryInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<EntryInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// All operations are asynchronous so that directory-backed and in-memory
/// stores look identical to callers.
///
/// # Key Handling
/// Keys must be validated using [`validate_key`](crate::validate_key) before
/// use. Implementations should enforce this validation.
///
/// # Examples
///
/// ```
/// use showreel_storage::{backend::StorageBackend, error::Result};
///
/// async fn stored_list(backend: &dyn StorageBackend) -> Result<Vec<u8>> {
///     Ok(backend.get("showreel.prefetch.session").await?.unwrap_or_default())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// List all entries whose key starts with an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`keys_stream()`](Self::keys_stream) into a [`Vec`] before
    /// returning.
    async fn keys(&self, prefix: Option<&str>) -> Result<Vec<EntryInfo>> {
        self.keys_stream(prefix).try_collect().await
    }

    /// Stream entry metadata whose key starts with an optional prefix.
    ///
    /// Unlike [`validate_key`](crate::validate_key), the prefix is a plain
    /// string match: `"showreel.prefetch."` matches every versioned key.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use showreel_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.keys_stream(Some("showreel."));
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.key, info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn keys_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryInfoStream<'a>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read a stored value.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key does
    /// not exist.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Read a stored value, mapping a missing key to `None`.
    ///
    /// This mirrors `Storage.getItem()` returning `null`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.read(key).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Write a value, creating or overwriting the key.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Delete a key.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key does
    /// not exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get entry metadata without reading the value.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key does
    /// not exist.
    async fn stat(&self, key: &str) -> Result<EntryInfo>;
}
