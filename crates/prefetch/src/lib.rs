//! Best-effort video prefetching.
//!
//! Given the catalog on the page, warm the browser cache for a handful of
//! self-hosted video files before anyone clicks on them, and remember which
//! ones were warmed so a reload doesn't repeat the work. Third-party embeds
//! are never touched.
//!
//! Three things trigger a prefetch:
//! - a batch over the first few direct items, some time after the page renders;
//! - the pointer resting on an item;
//! - the playback dialog opening on an item nothing prefetched yet.
//!
//! None of it is allowed to fail loudly. See [`PrefetchController`].

mod config;
mod controller;
pub mod error;
mod loader;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod record;

pub use crate::config::{MarkPolicy, PrefetchConfig, PreloadMode};
pub use crate::controller::{Pending, Playback, PrefetchController, PrefetchOutcome};
#[cfg(feature = "http")]
pub use crate::loader::HttpLoader;
pub use crate::loader::{Loaded, LoaderHandle, MediaLoader};
pub use crate::record::{KEY_PREFIX, LEGACY_KEYS, SESSION_KEY};
