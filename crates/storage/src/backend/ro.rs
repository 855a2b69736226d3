//! Read-only storage backend.
//!
//! Wraps another implementation and prevents write operations from
//! executing, while still indicating success on return. This is how a
//! session behaves when the client has storage disabled: reads see whatever
//! was already there, writes vanish.

use async_trait::async_trait;

use crate::error::{ErrorKind, Result};
use crate::{BackendHandle, EntryInfo, StorageBackend, backend::EntryInfoStream};

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn keys_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryInfoStream<'a> {
        self.inner.keys_stream(prefix)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        tracing::info!(store = self.name(), key, bytes = data.len(), "Skipping write to read-only storage");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if !self.inner.exists(key).await? {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        tracing::info!(store = self.name(), key, "Skipping delete from read-only storage");
        Ok(())
    }

    async fn stat(&self, key: &str) -> Result<EntryInfo> {
        self.inner.stat(key).await
    }
}
