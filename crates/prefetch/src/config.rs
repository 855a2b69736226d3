use crate::error::{ErrorKind, Result};
use crate::record::{KEY_PREFIX, SESSION_KEY};
use serde::{Deserialize, Serialize};
use showreel_storage::validate_key;
use std::time::Duration;

/// How much of a video to pull down ahead of playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreloadMode {
    /// Only enough of the file for the player to read its metadata.
    #[default]
    Metadata,
    /// The whole file.
    Full,
}

/// When a locator counts as cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkPolicy {
    /// Once the loader confirms the load.
    #[default]
    OnSuccess,
    /// As soon as the load is scheduled; unmarked again if it fails.
    OnAttempt,
}

/// Tunables for the prefetch heuristic.
///
/// Every timing constant is configuration rather than code: the site went
/// through several values for each, none of them obviously right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Delay between page render and the batch prefetch.
    pub initial_delay_ms: u64,
    /// Maximum number of items the batch prefetch schedules.
    pub batch_cap: usize,
    /// Delay between consecutive batch item starts.
    pub stagger_ms: u64,
    /// How long the pointer must rest on an item before it is prefetched.
    pub hover_dwell_ms: u64,
    pub mode: PreloadMode,
    /// Bytes requested per item in [`PreloadMode::Metadata`].
    pub metadata_bytes: u64,
    /// Upper bound on a whole load, from connecting to the last body byte.
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub mark: MarkPolicy,
    /// Mirror the record into the persistent store.
    pub persist: bool,
    /// Version tag of the persistent record key. Rotating it abandons every
    /// previously persisted record.
    pub version: String,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3_000,
            batch_cap: 3,
            stagger_ms: 500,
            hover_dwell_ms: 3_000,
            mode: PreloadMode::Metadata,
            metadata_bytes: 256 * 1024,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            mark: MarkPolicy::OnSuccess,
            persist: true,
            version: "v1".to_string(),
        }
    }
}

impl PrefetchConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn hover_dwell(&self) -> Duration {
        Duration::from_millis(self.hover_dwell_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Storage key of the persistent record for this version.
    pub fn record_key(&self) -> String {
        format!("{KEY_PREFIX}{}", self.version)
    }

    /// Reject combinations that can't work.
    pub fn validate(&self) -> Result<()> {
        let key = self.record_key();
        if validate_key(&key).is_err() {
            exn::bail!(ErrorKind::InvalidConfig(format!("version {:?} does not form a valid storage key", self.version)));
        }
        if key == SESSION_KEY {
            exn::bail!(ErrorKind::InvalidConfig("version must not collide with the session record".to_string()));
        }
        if self.mode == PreloadMode::Metadata && self.metadata_bytes == 0 {
            exn::bail!(ErrorKind::InvalidConfig("metadata_bytes must be positive in metadata mode".to_string()));
        }
        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            exn::bail!(ErrorKind::InvalidConfig("load timeouts must be positive".to_string()));
        }
        Ok(())
    }
}
