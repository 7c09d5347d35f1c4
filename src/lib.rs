//! Paged wallpaper feed, masonry layout and a persisted liked set.

pub mod catalog;
pub mod config;
pub mod feed;
pub mod layout;
pub mod liked;
pub mod models;

pub use catalog::{CatalogClient, CatalogError};
pub use config::FeedConfig;
pub use feed::{FeedController, FeedEvent, FeedPhase};
pub use layout::{LayoutCache, MasonryLayout};
pub use liked::{KeyValueStore, LikedStore};
pub use models::{ImageRecord, Placement, QueryState};
