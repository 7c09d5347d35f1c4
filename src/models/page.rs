use serde::{Deserialize, Serialize};

use super::ImageRecord;

/// One page of catalog results.
///
/// `total` and `pages` come from the backend and may be missing or stale;
/// exhaustion is decided from `items.len()` against the requested page size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<ImageRecord>,
    pub total: Option<u64>,
    pub pages: Option<u32>,
}

impl Page {
    pub fn new(items: Vec<ImageRecord>) -> Self {
        Self {
            items,
            total: None,
            pages: None,
        }
    }

    /// True when the backend returned fewer items than were asked for.
    pub fn is_short(&self, page_size: u32) -> bool {
        self.items.len() < page_size as usize
    }
}

/// An `{id, slug, name}` entry for a category or a filter dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOption {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub name: String,
}

/// Selectable values for the catalog-backed filter dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub wallpaper_types: Vec<CatalogOption>,
    pub screen_types: Vec<CatalogOption>,
    /// Colors carry their hex code in `slug`.
    pub colors: Vec<CatalogOption>,
}

impl FilterOptions {
    /// Human readable label for a selected filter value, if one is known.
    pub fn label_for(&self, key: super::FilterKey, value: &str) -> Option<&str> {
        use super::FilterKey;
        let list = match key {
            FilterKey::Order => return None,
            FilterKey::WallpaperType => &self.wallpaper_types,
            FilterKey::ScreenType => &self.screen_types,
            FilterKey::Color => &self.colors,
        };
        list.iter()
            .find(|opt| opt.id == value || opt.slug == value)
            .map(|opt| opt.name.as_str())
    }
}
