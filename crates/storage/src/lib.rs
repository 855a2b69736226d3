//! Key/value storage for client-side state.
//!
//! Stands in for the two browser storage areas the site relies on: a
//! session-scoped store that disappears with the tab, and a longer-lived store
//! that survives reloads. Both are reached through the same
//! [`StorageBackend`] trait so callers never care which one they hold.

pub mod backend;
pub mod error;
mod key;
mod models;

pub use crate::backend::StorageBackend;
pub use crate::key::validate as validate_key;
pub use crate::models::EntryInfo;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
