use std::time::Duration;

use tracing::warn;

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Default quiet period before a search is committed.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

/// Committed searches at least this long replace the active category.
pub const DEFAULT_SEARCH_MIN_CHARS: usize = 3;

/// Tuning for a `FeedController`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub page_size: u32,
    pub search_debounce: Duration,
    pub search_min_chars: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            search_min_chars: DEFAULT_SEARCH_MIN_CHARS,
        }
    }
}

impl FeedConfig {
    /// Defaults, overridden by `WALLFEED_PAGE_SIZE` and `WALLFEED_DEBOUNCE_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup("WALLFEED_PAGE_SIZE") {
            match raw.trim().parse::<u32>() {
                Ok(v) if v > 0 => config.page_size = v,
                _ => warn!(value = %raw, "Ignoring invalid WALLFEED_PAGE_SIZE"),
            }
        }
        if let Some(raw) = lookup("WALLFEED_DEBOUNCE_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.search_debounce = Duration::from_millis(ms),
                Err(_) => warn!(value = %raw, "Ignoring invalid WALLFEED_DEBOUNCE_MS"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_feed_config_default() {
        let config = FeedConfig::default();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.search_debounce, Duration::from_millis(400));
        assert_eq!(config.search_min_chars, 3);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> =
            [("WALLFEED_PAGE_SIZE", "40"), ("WALLFEED_DEBOUNCE_MS", "250")].into();
        let config = FeedConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.page_size, 40);
        assert_eq!(config.search_debounce, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let env: HashMap<&str, &str> =
            [("WALLFEED_PAGE_SIZE", "0"), ("WALLFEED_DEBOUNCE_MS", "soon")].into();
        let config = FeedConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config, FeedConfig::default());
    }
}
