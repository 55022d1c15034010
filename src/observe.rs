//! Counters and failure hooks for the write path.

use crate::core::ServiceError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives failures that the write path does not surface to callers.
///
/// `chunk_failed` fires once per chunk the flusher could not persist;
/// `discarded` fires when the delayed saver drops entities a flush reported
/// as unsaved.
pub trait FlushObserver<T>: Send + Sync {
    fn chunk_failed(&self, index: usize, error: &ServiceError);
    fn discarded(&self, items: &[T]);
}

/// Request and flush counters.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    create: AtomicU64,
    multi_create: AtomicU64,
    update: AtomicU64,
    remove: AtomicU64,
    chunks_failed: AtomicU64,
    entities_discarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub create_succeeded: u64,
    pub multi_create_succeeded: u64,
    pub update_succeeded: u64,
    pub remove_succeeded: u64,
    pub chunks_failed: u64,
    pub entities_discarded: u64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_create(&self) {
        self.create.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_multi_create(&self) {
        self.multi_create.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_update(&self) {
        self.update.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_remove(&self) {
        self.remove.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            create_succeeded: self.create.load(Ordering::Relaxed),
            multi_create_succeeded: self.multi_create.load(Ordering::Relaxed),
            update_succeeded: self.update.load(Ordering::Relaxed),
            remove_succeeded: self.remove.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            entities_discarded: self.entities_discarded.load(Ordering::Relaxed),
        }
    }
}

impl<T> FlushObserver<T> for ServiceMetrics {
    fn chunk_failed(&self, _index: usize, _error: &ServiceError) {
        self.chunks_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn discarded(&self, items: &[T]) {
        self.entities_discarded
            .fetch_add(items.len() as u64, Ordering::Relaxed);
    }
}
