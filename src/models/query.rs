use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Filter dimensions the catalog understands.
///
/// Ordering is stable so a `QueryState` hashes and compares the same way no
/// matter in which order filters were selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Order,
    WallpaperType,
    ScreenType,
    Color,
}

impl FilterKey {
    pub const ALL: [FilterKey; 4] = [
        FilterKey::Order,
        FilterKey::WallpaperType,
        FilterKey::ScreenType,
        FilterKey::Color,
    ];

    /// Name used by the filter selection UI.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::Order => "order",
            FilterKey::WallpaperType => "wallpaperType",
            FilterKey::ScreenType => "screenType",
            FilterKey::Color => "color",
        }
    }

    /// Name of the request parameter this filter becomes.
    pub fn param_name(self) -> &'static str {
        match self {
            FilterKey::Order => "sort",
            FilterKey::WallpaperType => "wallpaperType",
            FilterKey::ScreenType => "screenType",
            FilterKey::Color => "dominantColor",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter: {0}")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterKey {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" | "sort" => Ok(FilterKey::Order),
            "wallpaperType" | "wallpaper_type" => Ok(FilterKey::WallpaperType),
            "screenType" | "screen_type" => Ok(FilterKey::ScreenType),
            "color" | "colors" | "dominantColor" | "dominant_color" => Ok(FilterKey::Color),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

/// The user-controlled part of a feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub search: String,
    pub category: Option<String>,
    pub filters: BTreeMap<FilterKey, String>,
    pub page: u32,
    pub page_size: u32,
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            search: String::new(),
            category: None,
            filters: BTreeMap::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Applies a change and rewinds to the first page.
    pub fn apply(&mut self, change: QueryChange) {
        if let Some(search) = change.search {
            self.search = search;
        }
        if let Some(category) = change.category {
            self.category = category;
        }
        if change.reset_filters {
            self.filters.clear();
        }
        if let Some(filters) = change.replace_filters {
            self.filters = filters;
        }
        for (key, value) in change.set_filters {
            if value.is_empty() {
                self.filters.remove(&key);
            } else {
                self.filters.insert(key, value);
            }
        }
        for key in change.clear_filters {
            self.filters.remove(&key);
        }
        self.page = 1;
    }

    pub fn filter(&self, key: FilterKey) -> Option<&str> {
        self.filters.get(&key).map(String::as_str)
    }
}

/// A partial update to a `QueryState`.
///
/// Fields left untouched keep their current value. Clears run after sets,
/// so `set_filter(k, ..).clear_filter(k)` leaves `k` unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryChange {
    pub search: Option<String>,
    pub category: Option<Option<String>>,
    pub reset_filters: bool,
    pub replace_filters: Option<BTreeMap<FilterKey, String>>,
    pub set_filters: Vec<(FilterKey, String)>,
    pub clear_filters: Vec<FilterKey>,
}

impl QueryChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn category(mut self, slug: Option<String>) -> Self {
        self.category = Some(slug);
        self
    }

    pub fn set_filter(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.set_filters.push((key, value.into()));
        self
    }

    pub fn clear_filter(mut self, key: FilterKey) -> Self {
        self.clear_filters.push(key);
        self
    }

    pub fn replace_filters(mut self, filters: BTreeMap<FilterKey, String>) -> Self {
        self.replace_filters = Some(filters);
        self
    }

    pub fn reset_filters(mut self) -> Self {
        self.reset_filters = true;
        self
    }
}
