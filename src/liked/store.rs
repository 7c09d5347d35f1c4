use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::storage::KeyValueStore;
use super::writer::PersistWriter;
use crate::models::ImageRecord;

/// Storage key the liked set is serialized under, as a JSON array of records.
pub const LIKED_STORAGE_KEY: &str = "@vimorawalls_liked_images";

/// The user's liked images, held in memory and mirrored to storage.
///
/// Persistence is best effort: every mutation queues a full snapshot on the
/// background writer, and a failed write only costs durability, never the
/// in-memory change.
pub struct LikedStore {
    entries: Vec<ImageRecord>,
    ids: HashSet<String>,
    /// Stored entries that could not be decoded, written back untouched.
    unreadable: Vec<Value>,
    writer: PersistWriter,
}

impl LikedStore {
    /// Loads the persisted set.
    ///
    /// Entries are decoded one at a time; an entry that cannot be read is
    /// skipped but kept in storage on the next write. A read failure or a
    /// value that is not an array yields an empty set.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let raw_entries = match storage.get(LIKED_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Value>>(&raw) {
                Ok(list) => list,
                Err(e) => {
                    warn!("Failed to parse liked images, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load liked images, starting empty: {}", e);
                Vec::new()
            }
        };

        let total = raw_entries.len();
        let mut store = Self {
            entries: Vec::with_capacity(total),
            ids: HashSet::with_capacity(total),
            unreadable: Vec::new(),
            writer: PersistWriter::new(storage),
        };
        for raw in raw_entries {
            match serde_json::from_value::<ImageRecord>(raw.clone()) {
                Ok(image) if image.has_id() => {
                    if store.ids.insert(image.id.clone()) {
                        store.entries.push(image);
                    }
                }
                Ok(_) => warn!("Skipping liked entry without an id"),
                Err(e) => {
                    warn!("Skipping unreadable liked entry: {}", e);
                    store.unreadable.push(raw);
                }
            }
        }

        info!(count = store.entries.len(), total, "Loaded liked images");
        store
    }

    pub fn is_liked(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Liked images in the order they were liked.
    pub fn liked(&self) -> &[ImageRecord] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ImageRecord> {
        if !self.is_liked(id) {
            return None;
        }
        self.entries.iter().find(|img| img.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flips the liked state of `image`. Returns whether it is liked now.
    ///
    /// Images without an id are ignored.
    pub fn toggle_like(&mut self, image: &ImageRecord) -> bool {
        if !image.has_id() {
            return false;
        }
        if self.is_liked(&image.id) {
            self.remove_like(&image.id);
            false
        } else {
            self.add_like(image);
            true
        }
    }

    /// Adds `image` unless it is already liked. Returns whether anything changed.
    pub fn add_like(&mut self, image: &ImageRecord) -> bool {
        if !image.has_id() || !self.ids.insert(image.id.clone()) {
            return false;
        }
        self.entries.push(image.clone());
        debug!(id = %image.id, "Liked image");
        self.schedule_persist();
        true
    }

    /// Removes `id` if it is liked. Returns whether anything changed.
    pub fn remove_like(&mut self, id: &str) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.entries.retain(|img| img.id != id);
        debug!(id, "Unliked image");
        self.schedule_persist();
        true
    }

    /// Blocks until all scheduled snapshots have reached storage (or failed).
    pub fn flush(&self) {
        self.writer.flush();
    }

    pub fn writer(&self) -> &PersistWriter {
        &self.writer
    }

    fn schedule_persist(&self) {
        let snapshot: Result<Vec<Value>, _> =
            self.entries.iter().map(serde_json::to_value).collect();
        let payload = snapshot.and_then(|mut list| {
            list.extend(self.unreadable.iter().cloned());
            serde_json::to_string(&list)
        });
        match payload {
            Ok(payload) => self.writer.schedule(LIKED_STORAGE_KEY, payload),
            Err(e) => warn!("Failed to serialize liked images: {}", e),
        }
    }
}
