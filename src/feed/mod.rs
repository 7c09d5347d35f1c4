//! Feed state: query, pagination, search debounce and stale-response handling.
//!
//! - `controller` - `FeedController`, the paged item list and its fetch loop
//! - `debounce` - keystroke coalescing for the search box
//! - `signature` - identity of the query a fetch was issued for

pub mod controller;
pub mod debounce;
pub mod signature;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{FeedController, FeedEvent, FeedPhase};
pub use debounce::Debouncer;
pub use signature::QuerySignature;
