//! Recording loader for tests.

use crate::config::PreloadMode;
use crate::error::{ErrorKind, Result};
use crate::loader::{Loaded, MediaLoader};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Loader that records every call and never touches the network.
///
/// Call times come from [`tokio::time::Instant`], so tests running on a
/// paused clock can assert exact spacing between loads.
#[derive(Default)]
pub struct MockLoader {
    calls: Mutex<Vec<(String, Instant)>>,
    failing: HashSet<String>,
    latency: Duration,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loads of these locators fail with a 404.
    pub fn failing(mut self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.failing.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Make every load take this long before it resolves.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Locators loaded so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    /// When each load started, in call order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.lock().iter().map(|(_, at)| *at).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Instant)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MediaLoader for MockLoader {
    async fn load(&self, url: &str, mode: PreloadMode) -> Result<Loaded> {
        self.lock().push((url.to_string(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.contains(url) {
            exn::bail!(ErrorKind::Status(404));
        }
        let bytes = match mode {
            PreloadMode::Metadata => 1024,
            PreloadMode::Full => 4096,
        };
        Ok(Loaded { bytes })
    }
}
