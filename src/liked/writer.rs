//! Background writer for liked-set snapshots.
//!
//! - One worker thread owns all storage writes
//! - Snapshots queued while a write is in progress are coalesced; only the
//!   newest one reaches storage
//! - Write failures are logged and counted, never returned to the caller

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use super::storage::KeyValueStore;

enum WriterMsg {
    Write { key: String, payload: String },
    Flush(Sender<()>),
}

/// Counters shared with the worker thread.
#[derive(Debug, Default)]
struct WriterStats {
    written: AtomicUsize,
    coalesced: AtomicUsize,
    failed: AtomicUsize,
}

pub struct PersistWriter {
    /// Sender for new snapshots; `None` once shut down.
    tx: Option<Sender<WriterMsg>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<WriterStats>,
}

impl PersistWriter {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (tx, rx) = flume::unbounded();
        let stats = Arc::new(WriterStats::default());

        let worker_stats = Arc::clone(&stats);
        let worker = thread::Builder::new()
            .name("liked-writer".to_string())
            .spawn(move || writer_loop(rx, storage, worker_stats));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn liked writer, changes will stay in memory: {}", e);
                None
            }
        };

        Self {
            tx: worker.as_ref().map(|_| tx),
            worker,
            stats,
        }
    }

    /// Queues `payload` to be stored under `key`.
    pub fn schedule(&self, key: &str, payload: String) {
        let Some(tx) = &self.tx else {
            warn!("Liked writer unavailable, dropping snapshot");
            return;
        };
        if tx
            .send(WriterMsg::Write {
                key: key.to_string(),
                payload,
            })
            .is_err()
        {
            error!("Liked writer disconnected");
        }
    }

    /// Blocks until every snapshot queued before this call has been handled.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = flume::bounded(1);
        if tx.send(WriterMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Number of snapshots written successfully.
    pub fn written_count(&self) -> usize {
        self.stats.written.load(Ordering::Relaxed)
    }

    /// Number of snapshots superseded before they were written.
    pub fn coalesced_count(&self) -> usize {
        self.stats.coalesced.load(Ordering::Relaxed)
    }

    /// Number of writes the storage rejected.
    pub fn failed_count(&self) -> usize {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Drains outstanding snapshots and stops the worker.
    pub fn shutdown(&mut self) {
        debug!("Shutting down liked writer");
        // Dropping the sender lets the worker finish its queue and exit.
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PersistWriter {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown();
        }
    }
}

fn writer_loop(rx: Receiver<WriterMsg>, storage: Arc<dyn KeyValueStore>, stats: Arc<WriterStats>) {
    debug!("Liked writer started");

    while let Ok(first) = rx.recv() {
        let mut pending: Option<(String, String)> = None;

        for msg in std::iter::once(first).chain(rx.try_iter()) {
            match msg {
                WriterMsg::Write { key, payload } => {
                    if pending.replace((key, payload)).is_some() {
                        stats.coalesced.fetch_add(1, Ordering::Relaxed);
                    }
                }
                WriterMsg::Flush(ack) => {
                    if let Some((key, payload)) = pending.take() {
                        write_snapshot(storage.as_ref(), &stats, &key, &payload);
                    }
                    let _ = ack.send(());
                }
            }
        }

        if let Some((key, payload)) = pending.take() {
            write_snapshot(storage.as_ref(), &stats, &key, &payload);
        }
    }

    debug!("Liked writer stopped");
}

fn write_snapshot(storage: &dyn KeyValueStore, stats: &WriterStats, key: &str, payload: &str) {
    match storage.set(key, payload) {
        Ok(()) => {
            stats.written.fetch_add(1, Ordering::Relaxed);
            trace!(key, bytes = payload.len(), "Persisted liked snapshot");
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(key, "Failed to save liked images: {}", e);
        }
    }
}
