use xxhash_rust::xxh3::xxh3_64;

use crate::models::QueryState;

/// Identifies the query a fetch was issued for.
///
/// `digest` covers everything in the query except the page number, and
/// `generation` is bumped on every replace or refresh, so re-issuing the same
/// query still makes older in-flight fetches stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuerySignature {
    pub generation: u64,
    pub digest: u64,
}

impl QuerySignature {
    pub fn new(query: &QueryState, generation: u64) -> Self {
        Self {
            generation,
            digest: query_digest(query),
        }
    }
}

/// Hash of the page-independent part of a query.
pub fn query_digest(query: &QueryState) -> u64 {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(query.search.trim().as_bytes());
    buf.push(0);
    if let Some(category) = &query.category {
        buf.extend_from_slice(category.as_bytes());
    }
    buf.push(0);
    for (key, value) in &query.filters {
        buf.extend_from_slice(key.as_str().as_bytes());
        buf.push(b'=');
        buf.extend_from_slice(value.as_bytes());
        buf.push(0);
    }
    buf.extend_from_slice(&query.page_size.to_le_bytes());
    xxh3_64(&buf)
}
