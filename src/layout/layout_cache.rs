use crate::layout::masonry::{MasonryLayout, MasonryState};
use crate::models::{ImageRecord, Placement};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

/// Maximum number of cached layouts to keep in memory.
const MAX_CACHE_ENTRIES: usize = 8;

/// Cached layout state for one column count.
#[derive(Debug, Clone)]
struct CachedLayout {
    /// Hash of the ids the state was built from, in order
    list_hash: u64,
    state: MasonryState,
}

/// Layout cache keyed by column count.
///
/// A feed only ever grows by appending pages, so when the new item list starts
/// with exactly the items a cached state was built from, the cached state is
/// extended with the tail instead of being recomputed. Anything else (replaced
/// list, reordering, different column count) falls back to a full layout.
pub struct LayoutCache {
    layout: MasonryLayout,
    cache: Mutex<LruCache<usize, CachedLayout>>,
}

impl LayoutCache {
    /// Creates a new empty layout cache with default layout settings.
    pub fn new() -> Self {
        Self::with_layout(MasonryLayout::default())
    }

    pub fn with_layout(layout: MasonryLayout) -> Self {
        let capacity = NonZeroUsize::new(MAX_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Self {
            layout,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn layout(&self) -> &MasonryLayout {
        &self.layout
    }

    /// Computes a fast hash of the id list.
    /// Any change to ids or order changes the hash.
    pub fn compute_list_hash(items: &[ImageRecord]) -> u64 {
        let mut hasher_input = Vec::with_capacity(items.len() * 32);

        for item in items {
            hasher_input.extend_from_slice(item.id.as_bytes());
            // Separator so ["ab", "c"] and ["a", "bc"] differ
            hasher_input.push(0);
        }

        xxh3_64(&hasher_input)
    }

    /// Computes placements for `items`, reusing cached work when `items`
    /// extends the list last laid out at this column count.
    pub fn compute(&self, items: &[ImageRecord], columns: usize) -> Vec<Placement> {
        let columns = columns.max(1);
        let mut cache = self.cache.lock();

        if let Some(entry) = cache.get_mut(&columns) {
            let cached_len = entry.state.len();
            if cached_len <= items.len()
                && Self::compute_list_hash(&items[..cached_len]) == entry.list_hash
            {
                entry.state.extend(&items[cached_len..]);
                entry.list_hash = Self::compute_list_hash(items);
                trace!(
                    columns,
                    reused = cached_len,
                    added = items.len() - cached_len,
                    "Extended cached masonry layout"
                );
                return entry.state.placements().to_vec();
            }
        }

        let mut state = self.layout.start(columns);
        state.extend(items);
        let placements = state.placements().to_vec();
        cache.put(
            columns,
            CachedLayout {
                list_hash: Self::compute_list_hash(items),
                state,
            },
        );
        trace!(columns, items = items.len(), "Computed masonry layout");
        placements
    }

    /// Clears the entire cache.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Returns the number of cached layouts.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Number of items the cached layout for `columns` currently covers.
    pub fn cached_len(&self, columns: usize) -> Option<usize> {
        self.cache.lock().peek(&columns.max(1)).map(|e| e.state.len())
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}
