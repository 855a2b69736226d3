//! Portfolio media catalog.
//!
//! The catalog is static fixture data: an ordered list of [`MediaItem`]s
//! describing the video works shown on the site. Nothing here mutates at
//! runtime. The one piece of logic is [`classify`], which decides whether an
//! item's source points at a raw file the client may fetch ahead of time or
//! at a third-party player page that must only ever be embedded.

mod catalog;
pub mod error;
mod item;
mod source;

pub use crate::catalog::Catalog;
pub use crate::item::MediaItem;
pub use crate::source::{SourceKind, classify, is_direct_video_url};
