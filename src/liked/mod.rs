//! Locally persisted liked images.
//!
//! - `LikedStore` - in-memory set with like/unlike/toggle
//! - `PersistWriter` - background snapshot writer
//! - `KeyValueStore` - storage boundary (`SqliteKv`, `MemoryKv`)

pub mod storage;
pub mod store;
pub mod writer;

pub use storage::{open_or_memory, KeyValueStore, MemoryKv, SqliteKv, StorageError};
pub use store::{LikedStore, LIKED_STORAGE_KEY};
pub use writer::PersistWriter;
