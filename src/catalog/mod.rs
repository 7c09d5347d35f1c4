//! Boundary to the remote wallpaper catalog.
//!
//! - `CatalogClient` - the capability the feed fetches through
//! - `params` - pure mapping from query state to request parameters
//! - `normalize` - total mapping from backend JSON to canonical records

pub mod normalize;
pub mod params;

use async_trait::async_trait;

use crate::models::{CatalogOption, FilterOptions, Page};

pub use params::{CategoryIndex, RequestParams};

/// Failures a catalog fetch can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Network or backend failure. Recoverable by retrying.
    #[error("catalog request failed: {0}")]
    Transient(String),
    /// The backend answered with something we could not interpret at all.
    #[error("malformed catalog response: {0}")]
    Malformed(String),
}

/// Anything that can answer paged wallpaper queries.
///
/// The transport is up to the implementor; the only contract the feed relies
/// on is that a page shorter than `params.limit` means there is nothing more.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_page(&self, params: &RequestParams) -> Result<Page, CatalogError>;

    /// Top-level categories as `{id, slug, name}`.
    async fn fetch_categories(&self) -> Result<Vec<CatalogOption>, CatalogError> {
        Ok(Vec::new())
    }

    /// Values for the catalog-backed filter dimensions.
    async fn fetch_filter_options(&self) -> Result<FilterOptions, CatalogError> {
        Ok(FilterOptions::default())
    }
}
