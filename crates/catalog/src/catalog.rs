use crate::error::{ErrorKind, Result};
use crate::item::MediaItem;
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

/// Ordered, read-only list of media items.
///
/// Order matters: it is the order items are shown in, and the order the
/// batch prefetch walks them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<MediaItem>,
}

impl Catalog {
    pub fn new(items: impl Into<Vec<MediaItem>>) -> Self {
        Self { items: items.into() }
    }

    /// Parse a catalog from a JSON array of items.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<MediaItem> = serde_json::from_str(json).or_raise(|| ErrorKind::InvalidData)?;
        Ok(Self { items })
    }

    /// Read and parse a catalog file.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).or_raise(|| ErrorKind::Unreadable(path.to_path_buf()))?;
        let catalog = Self::from_json(&json)?;
        tracing::debug!(items = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by its identifier. Blank identifiers never match.
    pub fn get(&self, id: &str) -> Option<&MediaItem> {
        if id.is_empty() {
            return None;
        }
        self.items.iter().find(|item| item.id == id)
    }

    /// Items in the given category, in catalog order.
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a MediaItem> + 'a {
        self.items.iter().filter(move |item| item.category == category)
    }

    /// Distinct categories in first-seen order (the tab order on the site).
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for item in &self.items {
            if !seen.contains(&item.category.as_str()) {
                seen.push(&item.category);
            }
        }
        seen
    }

    /// Items whose source may be prefetched, in catalog order.
    pub fn direct_items(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter().filter(|item| item.is_direct())
    }
}

impl From<Vec<MediaItem>> for Catalog {
    fn from(items: Vec<MediaItem>) -> Self {
        Self { items }
    }
}
