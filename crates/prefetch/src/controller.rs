use crate::config::{MarkPolicy, PrefetchConfig};
use crate::error::Result;
use crate::loader::LoaderHandle;
use crate::record::PrefetchRecord;
use showreel_catalog::{MediaItem, SourceKind, is_direct_video_url};
use showreel_storage::BackendHandle;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

/// What happened to a single prefetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchOutcome {
    Cached { bytes: u64 },
    Failed,
}

/// Source handed to the playback dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// Raw file for a `<video>` element. `cached` is `true` when the file was
    /// already warmed before the dialog opened.
    Direct { url: String, cached: bool },
    /// Third-party player page for an `<iframe>`.
    Embed { player_url: String },
}

/// A timer that has not fired yet, and whatever it does once it has.
///
/// Cancelling (or dropping) before the timer fires means nothing happens.
/// Once fired, the work it started runs to completion regardless: cancelling
/// only stops waiting for it.
#[must_use = "dropping a Pending cancels it"]
pub struct Pending<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Pending<T> {
    fn spawn(future: impl Future<Output = T> + Send + 'static) -> Self {
        Self { handle: tokio::spawn(future) }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result. `None` if cancelled.
    pub async fn wait(mut self) -> Option<T> {
        (&mut self.handle).await.ok()
    }
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Default)]
struct State {
    /// Every locator handed to the loader this session, plus restored ones.
    scheduled: HashSet<String>,
    /// Locators whose load hasn't resolved yet.
    loading: HashSet<String>,
    cached: BTreeSet<String>,
    batch_started: bool,
}

struct Inner {
    config: PrefetchConfig,
    loader: LoaderHandle,
    record: PrefetchRecord,
    state: Mutex<State>,
    /// Serializes record writes so an older snapshot never lands last.
    persist_lock: tokio::sync::Mutex<()>,
    in_flight: watch::Sender<usize>,
}

/// Prefetch state for one browsing session.
///
/// Cheap to clone; clones share state. Every scheduling method spawns onto
/// the current tokio runtime and must be called from within one.
///
/// Nothing the controller schedules ever returns an error: failed loads are
/// logged and not retried, failed storage writes are logged and the record
/// simply doesn't survive a reload.
#[derive(Clone)]
pub struct PrefetchController {
    inner: Arc<Inner>,
}

impl PrefetchController {
    /// Start a session over the given stores.
    ///
    /// Removes stale records, then restores whatever a previous session left
    /// behind. `persistent` is ignored when the configuration disables
    /// persistence.
    #[instrument(level = "debug", skip_all, fields(version = %config.version, persist = config.persist))]
    pub async fn open(
        config: PrefetchConfig,
        loader: LoaderHandle,
        session: BackendHandle,
        persistent: Option<BackendHandle>,
    ) -> Result<Self> {
        config.validate()?;
        let persistent = persistent.filter(|_| config.persist);
        let record = PrefetchRecord::new(session, persistent, config.record_key());
        let removed = record.migrate().await;
        let cached = record.restore().await;
        tracing::debug!(removed, restored = cached.len(), "Prefetch session opened");
        let state = State {
            scheduled: cached.iter().cloned().collect(),
            loading: HashSet::new(),
            cached,
            batch_started: false,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                loader,
                record,
                state: Mutex::new(state),
                persist_lock: tokio::sync::Mutex::new(()),
                in_flight: watch::Sender::new(0),
            }),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prefetch a single locator.
    ///
    /// Returns `None` without doing anything for embeds and for locators
    /// already scheduled this session (whatever their outcome was).
    pub fn prefetch(&self, url: &str) -> Option<JoinHandle<PrefetchOutcome>> {
        if !is_direct_video_url(url) {
            tracing::trace!(url, "Not a direct video, skipping prefetch");
            return None;
        }
        {
            let mut state = self.lock_state();
            if !state.scheduled.insert(url.to_string()) {
                tracing::trace!(url, "Already scheduled, skipping prefetch");
                return None;
            }
            state.loading.insert(url.to_string());
            if self.inner.config.mark == MarkPolicy::OnAttempt {
                state.cached.insert(url.to_string());
            }
        }
        self.inner.in_flight.send_modify(|count| *count += 1);
        let this = self.clone();
        let url = url.to_string();
        Some(tokio::spawn(async move {
            let outcome = this.run(url).await;
            this.inner.in_flight.send_modify(|count| *count -= 1);
            outcome
        }))
    }

    #[instrument(level = "debug", skip(self))]
    async fn run(&self, url: String) -> PrefetchOutcome {
        let config = &self.inner.config;
        if config.mark == MarkPolicy::OnAttempt {
            self.persist().await;
        }
        match self.inner.loader.load(&url, config.mode).await {
            Ok(loaded) => {
                tracing::info!(bytes = loaded.bytes, "Video prefetched");
                let added = {
                    let mut state = self.lock_state();
                    state.loading.remove(&url);
                    state.cached.insert(url)
                };
                if added {
                    self.persist().await;
                }
                PrefetchOutcome::Cached { bytes: loaded.bytes }
            },
            Err(err) => {
                tracing::warn!(error = ?err, "Video prefetch failed");
                let removed = {
                    let mut state = self.lock_state();
                    state.loading.remove(&url);
                    state.cached.remove(&url)
                };
                if removed {
                    self.persist().await;
                }
                PrefetchOutcome::Failed
            },
        }
    }

    /// Wait until no load is in flight.
    pub async fn settled(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        // The sender lives in `self`, so the channel can't close while waiting.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    async fn persist(&self) {
        let _guard = self.inner.persist_lock.lock().await;
        let snapshot = self.lock_state().cached.clone();
        // Failures are logged by the record.
        let _ = self.inner.record.save(&snapshot).await;
    }

    /// Prefetch the first `batch_cap` direct items, one every `stagger`.
    ///
    /// Only the first call per session does anything; later calls return
    /// `None`. The returned task resolves to the locators it started once the
    /// last one has been started, without waiting for any load to finish.
    pub fn prefetch_batch(&self, items: &[MediaItem]) -> Option<JoinHandle<Vec<String>>> {
        {
            let mut state = self.lock_state();
            if state.batch_started {
                tracing::debug!("Batch prefetch already ran this session");
                return None;
            }
            state.batch_started = true;
        }
        let urls: Vec<String> = items
            .iter()
            .filter(|item| item.is_direct())
            .take(self.inner.config.batch_cap)
            .map(|item| item.source.clone())
            .collect();
        let this = self.clone();
        Some(tokio::spawn(async move { this.run_batch(urls).await }))
    }

    #[instrument(level = "debug", skip_all, fields(candidates = urls.len()))]
    async fn run_batch(&self, urls: Vec<String>) -> Vec<String> {
        let mut started: Vec<String> = Vec::new();
        for url in urls {
            if self.lock_state().scheduled.contains(&url) {
                continue;
            }
            if !started.is_empty() {
                tokio::time::sleep(self.inner.config.stagger()).await;
            }
            if self.prefetch(&url).is_some() {
                started.push(url);
            }
        }
        tracing::debug!(started = started.len(), "Batch prefetch scheduled");
        started
    }

    /// Run [`prefetch_batch`](Self::prefetch_batch) after `initial_delay`.
    ///
    /// This is the page-render trigger: cancel the returned [`Pending`] when
    /// the page goes away before the delay elapses.
    pub fn schedule_initial_batch(&self, items: Vec<MediaItem>) -> Pending<Option<Vec<String>>> {
        let this = self.clone();
        let delay = self.inner.config.initial_delay();
        Pending::spawn(async move {
            tokio::time::sleep(delay).await;
            match this.prefetch_batch(&items) {
                Some(batch) => batch.await.ok(),
                None => None,
            }
        })
    }

    /// Prefetch `url` once the pointer has rested on it for `hover_dwell`.
    ///
    /// Cancel the returned [`Pending`] when the pointer leaves.
    pub fn hover(&self, url: &str) -> Pending<Option<PrefetchOutcome>> {
        let this = self.clone();
        let url = url.to_string();
        let dwell = self.inner.config.hover_dwell();
        Pending::spawn(async move {
            tokio::time::sleep(dwell).await;
            match this.prefetch(&url) {
                Some(task) => task.await.ok(),
                None => None,
            }
        })
    }

    /// The playback dialog opened on `item`.
    ///
    /// Direct items not yet scheduled are prefetched now as a fallback.
    pub fn play(&self, item: &MediaItem) -> Playback {
        match item.source_kind() {
            SourceKind::Direct => {
                let cached = self.is_cached(&item.source);
                let _ = self.prefetch(&item.source);
                Playback::Direct { url: item.source.clone(), cached }
            },
            kind => Playback::Embed {
                player_url: kind.embed_url(&item.source).unwrap_or_else(|| item.source.clone()),
            },
        }
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.lock_state().cached.contains(url)
    }

    /// Cached locators, sorted.
    pub fn cached(&self) -> Vec<String> {
        self.lock_state().cached.iter().cloned().collect()
    }

    /// Forget every cached locator, here and in storage.
    ///
    /// Forgotten locators may be prefetched again. Loads still in flight
    /// stay scheduled, and the batch still runs at most once per session.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.inner.persist_lock.lock().await;
        {
            let mut state = self.lock_state();
            let State { scheduled, loading, cached, .. } = &mut *state;
            let cleared = std::mem::take(cached);
            scheduled.retain(|url| !cleared.contains(url) || loading.contains(url));
        }
        self.inner.record.clear().await?;
        tracing::info!("Prefetch record cleared");
        Ok(())
    }
}
