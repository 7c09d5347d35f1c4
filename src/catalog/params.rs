use crate::models::{CatalogOption, FilterKey, QueryState};

/// Parameters for one `fetch_page` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestParams {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub wallpaper_type: Option<String>,
    pub screen_type: Option<String>,
    pub dominant_color: Option<String>,
    pub main_category: Option<String>,
}

impl RequestParams {
    /// Ordered `(name, value)` pairs for a query string. Empty values are skipped.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        let mut push = |name: &'static str, value: Option<&str>| {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                pairs.push((name, v.to_string()));
            }
        };
        push("search", self.search.as_deref());
        for key in FilterKey::ALL {
            push(key.param_name(), self.filter(key));
        }
        push("mainCategory", self.main_category.as_deref());
        pairs
    }

    /// Value sent for one filter dimension.
    pub fn filter(&self, key: FilterKey) -> Option<&str> {
        match key {
            FilterKey::Order => self.sort.as_deref(),
            FilterKey::WallpaperType => self.wallpaper_type.as_deref(),
            FilterKey::ScreenType => self.screen_type.as_deref(),
            FilterKey::Color => self.dominant_color.as_deref(),
        }
    }

    fn set_filter(&mut self, key: FilterKey, value: &str) {
        let slot = match key {
            FilterKey::Order => &mut self.sort,
            FilterKey::WallpaperType => &mut self.wallpaper_type,
            FilterKey::ScreenType => &mut self.screen_type,
            FilterKey::Color => &mut self.dominant_color,
        };
        *slot = Some(value.to_string());
    }
}

/// Category slug to catalog id lookup, loaded once from the catalog.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    categories: Vec<CatalogOption>,
}

impl CategoryIndex {
    pub fn new(categories: Vec<CatalogOption>) -> Self {
        Self { categories }
    }

    pub fn id_for_slug(&self, slug: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.slug == slug)
            .map(|c| c.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn categories(&self) -> &[CatalogOption] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Maps query state to request parameters. Never fails.
///
/// An active category whose slug is not in `categories` is dropped from the
/// request rather than reported.
pub fn build(query: &QueryState, categories: &CategoryIndex) -> RequestParams {
    let mut params = RequestParams {
        page: query.page.max(1),
        limit: query.page_size,
        ..Default::default()
    };

    let search = query.search.trim();
    if !search.is_empty() {
        params.search = Some(search.to_string());
    }

    for (key, value) in &query.filters {
        params.set_filter(*key, value);
    }

    if let Some(slug) = query.category.as_deref() {
        params.main_category = categories.id_for_slug(slug).map(str::to_string);
    }

    params
}
