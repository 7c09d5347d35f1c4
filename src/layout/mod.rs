pub mod layout_cache;
pub mod masonry;

pub use layout_cache::LayoutCache;
pub use masonry::{column_count_for_width, MasonryLayout, MasonryState};
