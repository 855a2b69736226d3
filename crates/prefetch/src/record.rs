//! Persisted list of cached locators.
//!
//! The list is stored as a JSON array of strings under one key in the session
//! store and, when enabled, one version-tagged key in the persistent store.
//! Everything here is best-effort from the controller's point of view: it
//! logs and carries on when a store misbehaves.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use showreel_storage::BackendHandle;
use showreel_storage::error::ErrorKind as StorageErrorKind;
use std::collections::BTreeSet;
use tracing::instrument;

/// Key of the record in the session store.
pub const SESSION_KEY: &str = "showreel.prefetch.session";
/// Prefix shared by every key this crate owns.
pub const KEY_PREFIX: &str = "showreel.prefetch.";
/// Keys written by earlier releases of the site, removed on sight.
pub const LEGACY_KEYS: &[&str] = &["preloadedVideos"];

pub struct PrefetchRecord {
    session: BackendHandle,
    persistent: Option<BackendHandle>,
    version_key: String,
}

impl PrefetchRecord {
    /// `version_key` must be a valid storage key distinct from [`SESSION_KEY`].
    pub fn new(session: BackendHandle, persistent: Option<BackendHandle>, version_key: impl Into<String>) -> Self {
        Self { session, persistent, version_key: version_key.into() }
    }

    fn stores(&self) -> impl Iterator<Item = (&BackendHandle, &str)> {
        std::iter::once((&self.session, SESSION_KEY))
            .chain(self.persistent.iter().map(|store| (store, self.version_key.as_str())))
    }

    /// Delete legacy keys and records of other versions from both stores.
    ///
    /// Returns the number of keys removed. Stale contents are dropped rather
    /// than merged: their format and provenance are unknown.
    #[instrument(level = "debug", skip(self), fields(version = %self.version_key))]
    pub async fn migrate(&self) -> usize {
        let mut removed = 0;
        for (store, keep) in self.stores() {
            let mut stale: Vec<String> = LEGACY_KEYS.iter().map(|key| (*key).to_string()).collect();
            match store.keys(Some(KEY_PREFIX)).await {
                Ok(entries) => stale.extend(entries.into_iter().map(|info| info.key).filter(|key| key != keep)),
                Err(err) => tracing::warn!(store = store.name(), error = ?err, "Failed to list prefetch keys"),
            }
            for key in stale {
                match store.delete(&key).await {
                    // Disabled stores accept the delete and keep the key.
                    Ok(()) if store.exists(&key).await.unwrap_or(true) => {
                        tracing::debug!(store = store.name(), key = %key, "Stale prefetch record left in place");
                    },
                    Ok(()) => {
                        tracing::info!(store = store.name(), key = %key, "Removed stale prefetch record");
                        removed += 1;
                    },
                    Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {},
                    Err(err) => tracing::warn!(store = store.name(), key = %key, error = ?err, "Failed to remove stale key"),
                }
            }
        }
        removed
    }

    /// Union of every stored list. Unreadable or corrupt lists count as empty.
    #[instrument(level = "debug", skip(self))]
    pub async fn restore(&self) -> BTreeSet<String> {
        let mut cached = BTreeSet::new();
        for (store, key) in self.stores() {
            match read_list(store, key).await {
                Ok(list) => cached.extend(list),
                Err(err) => tracing::warn!(store = store.name(), key, error = ?err, "Ignoring unreadable prefetch record"),
            }
        }
        tracing::debug!(count = cached.len(), "Prefetch record restored");
        cached
    }

    /// Write the full list to every store.
    ///
    /// All stores are attempted even if one fails; the first failure is
    /// returned.
    pub async fn save(&self, cached: &BTreeSet<String>) -> Result<()> {
        let data = serde_json::to_vec(cached).or_raise(|| ErrorKind::InvalidRecord(self.version_key.clone()))?;
        let mut result = Ok(());
        for (store, key) in self.stores() {
            if let Err(err) = store.write(key, &data).await {
                tracing::warn!(store = store.name(), key, error = ?err, "Failed to persist prefetch record");
                if result.is_ok() {
                    result = Err(err).or_raise(|| ErrorKind::Storage);
                }
            }
        }
        result
    }

    /// Remove the record from every store. Missing records are not an error.
    pub async fn clear(&self) -> Result<()> {
        for (store, key) in self.stores() {
            match store.delete(key).await {
                Ok(()) => {},
                Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {},
                Err(err) => return Err(err).or_raise(|| ErrorKind::Storage),
            }
        }
        Ok(())
    }
}

async fn read_list(store: &BackendHandle, key: &str) -> Result<Vec<String>> {
    let Some(data) = store.get(key).await.or_raise(|| ErrorKind::Storage)? else {
        return Ok(Vec::new());
    };
    serde_json::from_slice(&data).or_raise(|| ErrorKind::InvalidRecord(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use showreel_storage::backend::{MemoryBackend, ReadOnlyBackend, StorageBackend};
    use std::sync::Arc;

    fn record(session: &Arc<MemoryBackend>, persistent: &Arc<MemoryBackend>) -> PrefetchRecord {
        PrefetchRecord::new(session.clone(), Some(persistent.clone() as BackendHandle), "showreel.prefetch.v1")
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_save_and_restore() {
        let session = Arc::new(MemoryBackend::default());
        let persistent = Arc::new(MemoryBackend::default());
        let record = record(&session, &persistent);

        record.save(&set(&["b.mp4", "a.mp4"])).await.unwrap();
        assert_eq!(session.read(SESSION_KEY).await.unwrap(), br#"["a.mp4","b.mp4"]"#);
        assert_eq!(persistent.read("showreel.prefetch.v1").await.unwrap(), br#"["a.mp4","b.mp4"]"#);
        assert_eq!(record.restore().await, set(&["a.mp4", "b.mp4"]));
    }

    #[tokio::test]
    async fn test_restore_merges_stores() {
        let session = Arc::new(MemoryBackend::with_entries([(SESSION_KEY, br#"["a.mp4"]"#.to_vec())]));
        let persistent = Arc::new(MemoryBackend::with_entries([("showreel.prefetch.v1", br#"["b.mp4"]"#.to_vec())]));
        assert_eq!(record(&session, &persistent).restore().await, set(&["a.mp4", "b.mp4"]));
    }

    #[tokio::test]
    async fn test_restore_corrupt_is_empty() {
        let session = Arc::new(MemoryBackend::with_entries([(SESSION_KEY, b"{not json".to_vec())]));
        let persistent = Arc::new(MemoryBackend::with_entries([("showreel.prefetch.v1", br#"["b.mp4"]"#.to_vec())]));
        assert_eq!(record(&session, &persistent).restore().await, set(&["b.mp4"]));
    }

    #[tokio::test]
    async fn test_without_persistent_store() {
        let session = Arc::new(MemoryBackend::default());
        let record = PrefetchRecord::new(session.clone(), None, "showreel.prefetch.v1");
        record.save(&set(&["a.mp4"])).await.unwrap();
        assert!(session.exists(SESSION_KEY).await.unwrap());
        assert_eq!(record.restore().await, set(&["a.mp4"]));
    }

    #[tokio::test]
    async fn test_migrate_removes_stale_keys() {
        let session = Arc::new(MemoryBackend::with_entries([
            ("preloadedVideos", b"[\"old.mp4\"]".to_vec()),
            (SESSION_KEY, b"[]".to_vec()),
            ("showreel.prefetch.v0", b"[]".to_vec()),
        ]));
        let persistent = Arc::new(MemoryBackend::with_entries([
            ("preloadedVideos", b"[\"old.mp4\"]".to_vec()),
            ("showreel.prefetch.v0", b"[]".to_vec()),
            ("showreel.prefetch.v1", b"[\"a.mp4\"]".to_vec()),
            ("unrelated", b"keep".to_vec()),
        ]));
        let record = record(&session, &persistent);

        assert_eq!(record.migrate().await, 4);
        assert!(session.exists(SESSION_KEY).await.unwrap());
        assert!(!session.exists("preloadedVideos").await.unwrap());
        assert!(!persistent.exists("showreel.prefetch.v0").await.unwrap());
        assert!(persistent.exists("showreel.prefetch.v1").await.unwrap());
        assert!(persistent.exists("unrelated").await.unwrap());

        // Second run has nothing left to do.
        assert_eq!(record.migrate().await, 0);
    }

    #[tokio::test]
    async fn test_save_failure_reported() {
        let session = Arc::new(MemoryBackend::default().with_quota(8));
        let persistent = Arc::new(MemoryBackend::default());
        let record = record(&session, &persistent);

        let err = record.save(&set(&["a.mp4"])).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage));
        // The other store was still written.
        assert!(persistent.exists("showreel.prefetch.v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_only_store() {
        let session: BackendHandle = Arc::new(ReadOnlyBackend::new(Arc::new(MemoryBackend::default())));
        let record = PrefetchRecord::new(session, None, "showreel.prefetch.v1");
        record.save(&set(&["a.mp4"])).await.unwrap();
        assert!(record.restore().await.is_empty());
    }

    #[tokio::test]
    async fn test_migrate_read_only_counts_nothing() {
        let inner = Arc::new(MemoryBackend::with_entries([
            ("preloadedVideos", b"[\"old.mp4\"]".to_vec()),
            ("showreel.prefetch.v0", b"[]".to_vec()),
        ]));
        let session: BackendHandle = Arc::new(ReadOnlyBackend::new(inner.clone()));
        let record = PrefetchRecord::new(session, None, "showreel.prefetch.v1");

        assert_eq!(record.migrate().await, 0);
        assert!(inner.exists("preloadedVideos").await.unwrap());
        assert!(inner.exists("showreel.prefetch.v0").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let session = Arc::new(MemoryBackend::with_entries([(SESSION_KEY, b"[\"a.mp4\"]".to_vec())]));
        let persistent = Arc::new(MemoryBackend::default());
        let record = record(&session, &persistent);
        record.clear().await.unwrap();
        assert!(!session.exists(SESSION_KEY).await.unwrap());
        assert!(record.restore().await.is_empty());
    }
}
