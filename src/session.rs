//! Wiring a prefetch session from configuration.
//!
//! Each process run is one browsing session: the session store lives in
//! memory and dies with the process, while the persistent store is a
//! directory on disk.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use showreel_catalog::Catalog;
use showreel_config::Config;
use showreel_prefetch::{HttpLoader, LoaderHandle, PrefetchController};
use showreel_storage::BackendHandle;
use showreel_storage::backend::{LocalBackend, MemoryBackend, ReadOnlyBackend};
use std::path::Path;
use std::sync::Arc;

pub struct Stores {
    pub session: BackendHandle,
    pub persistent: BackendHandle,
}

impl Stores {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut session = MemoryBackend::default().with_name("session");
        if let Some(quota) = config.storage.session_quota {
            session = session.with_quota(quota);
        }
        let dir = config.storage_dir().or_raise(|| ErrorKind::Config)?;
        let persistent = LocalBackend::new("persistent", &dir).or_raise(|| ErrorKind::Storage)?;
        tracing::debug!(dir = %dir.display(), "Persistent store ready");

        let session: BackendHandle = Arc::new(session);
        let persistent: BackendHandle = Arc::new(persistent);
        Ok(match config.storage.read_only {
            true => Self {
                session: Arc::new(ReadOnlyBackend::new(session)),
                persistent: Arc::new(ReadOnlyBackend::new(persistent)),
            },
            false => Self { session, persistent },
        })
    }
}

/// Network loader honouring the configured range size and timeouts.
pub fn http_loader(config: &Config) -> Result<LoaderHandle> {
    let loader = HttpLoader::new(&config.prefetch).or_raise(|| ErrorKind::Prefetch)?;
    Ok(Arc::new(loader))
}

pub async fn open(config: &Config, loader: LoaderHandle) -> Result<PrefetchController> {
    let stores = Stores::from_config(config)?;
    PrefetchController::open(config.prefetch.clone(), loader, stores.session, Some(stores.persistent))
        .await
        .or_raise(|| ErrorKind::Prefetch)
}

pub fn catalog(config: &Config, path: Option<&Path>) -> Result<Catalog> {
    let path = path.or(config.catalog.as_deref()).ok_or_raise(|| ErrorKind::NoCatalog)?;
    Catalog::load(path).or_raise(|| ErrorKind::Catalog)
}
