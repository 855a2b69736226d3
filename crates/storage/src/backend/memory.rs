//! In-memory storage backend.

use super::EntryInfoStream;
use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use crate::models::EntryInfo;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::StorageBackend;

/// In-memory storage backend.
///
/// Values are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. This is the
/// session-scoped store: it lives exactly as long as the value does. It is
/// also the default double for tests that need a [`StorageBackend`] without
/// touching the filesystem.
///
/// An optional byte quota makes writes fail the way a full browser storage
/// area does.
///
/// # Examples
///
/// ```
/// use showreel_storage::backend::{MemoryBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::with_entries([
///     ("preloadedVideos", b"[]"),
/// ]);
/// assert!(backend.exists("preloadedVideos").await?);
///
/// backend.write("showreel.prefetch.session", b"[\"a.mp4\"]").await?;
/// assert!(backend.exists("showreel.prefetch.session").await?);
/// # Ok(())
/// # }
/// ```
pub struct MemoryBackend {
    name: String,
    quota: Option<u64>,
    storage: RwLock<HashMap<String, (OffsetDateTime, Vec<u8>)>>,
}

impl MemoryBackend {
    /// Create a memory backend pre-populated with entries.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then the
    /// test should not pass.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = OffsetDateTime::now_utc();
        for (key, data) in entries {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                panic!("MemoryBackend::with_entries: invalid key {key:?}");
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "memory".to_string(),
            quota: None,
            storage: RwLock::new(map),
        }
    }

    /// Change the name of the memory backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Limit the total number of stored bytes (keys and values both count).
    ///
    /// ```
    /// use showreel_storage::backend::MemoryBackend;
    ///
    /// let backend = MemoryBackend::default().with_quota(5 * 1024 * 1024);
    /// ```
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    fn entry_size(key: &str, data: &[u8]) -> u64 {
        (key.len() + data.len()) as u64
    }
}
impl Default for MemoryBackend {
    fn default() -> Self {
        let entries: [(&str, &[u8]); 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryInfoStream<'a> {
        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<EntryInfo> = {
                let guard = self.storage.read().await;
                let mut entries = guard
                    .iter()
                    .filter(|(key, _)| prefix.is_none_or(|pfx| key.starts_with(pfx)))
                    .map(|(key, (modified, data))| EntryInfo::new(key.as_str(), data.len() as u64, *modified))
                    .collect::<Vec<_>>();
                entries.sort_by(|a, b| a.key.cmp(&b.key));
                entries
            };
            for entry in entries {
                yield Ok(entry);
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let (_modified, data) =
            self.storage.read().await.get(&key).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))?;
        Ok(data)
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let key = validate_key(key)?;
        let mut guard = self.storage.write().await;
        if let Some(limit) = self.quota {
            let others: u64 = guard
                .iter()
                .filter(|(k, _)| **k != key)
                .map(|(k, (_, v))| Self::entry_size(k, v))
                .sum();
            let required = others + Self::entry_size(&key, data);
            if required > limit {
                exn::bail!(ErrorKind::QuotaExceeded { key, required, limit });
            }
        }
        guard.insert(key, (OffsetDateTime::now_utc(), data.to_vec()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.remove(&key).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))
    }

    async fn stat(&self, key: &str) -> Result<EntryInfo> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let (modified, data) = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(EntryInfo::new(key.as_str(), data.len() as u64, *modified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MemoryBackend::default();
        backend.write("test", b"hello").await.unwrap();
        let data = backend.read("test").await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn test_with_entries() {
        let backend = MemoryBackend::with_entries([("a.one", Vec::from(*b"1")), ("b.two", Vec::from(*b"2"))]);
        assert!(backend.exists("a.one").await.unwrap());
        assert!(backend.exists("b.two").await.unwrap());
        assert!(!backend.exists("c.nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MemoryBackend::default();
        let err = backend.read("missing").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_maps_missing_to_none() {
        let backend = MemoryBackend::with_entries([("present", Vec::from(*b"x"))]);
        assert_eq!(backend.get("present").await.unwrap(), Some(b"x".to_vec()));
        assert_eq!(backend.get("absent").await.unwrap(), None);
        // Invalid keys are still errors, not misses
        assert!(backend.get("../absent").await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MemoryBackend::default();
        backend.write("key", b"data").await.unwrap();
        backend.delete("key").await.unwrap();
        assert!(!backend.exists("key").await.unwrap());
        let err = backend.delete("key").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let backend = MemoryBackend::default();
        backend.write("key", b"12345").await.unwrap();
        let info = backend.stat("key").await.unwrap();
        assert_eq!(info.key, "key");
        assert_eq!(info.size, 5);
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let backend = MemoryBackend::with_entries([
            ("showreel.prefetch.v1", Vec::from(*b"a")),
            ("showreel.prefetch.v2", Vec::from(*b"b")),
            ("preloadedVideos", Vec::from(*b"c")),
        ]);
        let keys = backend.keys(Some("showreel.")).await.unwrap();
        let keys: Vec<_> = keys.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["showreel.prefetch.v1", "showreel.prefetch.v2"]);
        assert_eq!(backend.keys(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_quota_rejects_oversized_write() {
        let backend = MemoryBackend::default().with_quota(10);
        backend.write("k", b"123456789").await.unwrap();
        // Overwriting the same key only counts the new value
        backend.write("k", b"987654321").await.unwrap();
        let err = backend.write("other", b"x").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::QuotaExceeded { required: 16, limit: 10, .. }));
        // Rejected write leaves existing data untouched
        assert_eq!(backend.read("k").await.unwrap(), b"987654321");
        assert!(!backend.exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let backend = MemoryBackend::default();
        assert!(backend.read("../etc/passwd").await.is_err());
        assert!(backend.write("../escape", b"bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid key")]
    fn test_with_entries_panics_on_bad_key() {
        MemoryBackend::with_entries([("../escape", Vec::from(*b"bad"))]);
    }
}
