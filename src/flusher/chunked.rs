use super::{FlushContext, Flusher};
use crate::core::{Result, ServiceError};
use crate::observe::FlushObserver;
use crate::split::split_to_chunks;
use crate::storage::BulkStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, Level, event, info_span};

/// Flusher that writes a collection through a `BulkStore` in fixed-size chunks.
///
/// Chunks are written one after another in input order. A failed chunk is
/// recorded and the next chunk is still attempted, so a single call can leave
/// some chunks stored and others not. If the collection cannot be split at
/// all (zero chunk size) the whole input is reported back as unsaved.
pub struct ChunkFlusher<T, S> {
    chunk_size: usize,
    store: S,
    write_timeout: Option<Duration>,
    observer: Option<Arc<dyn FlushObserver<T>>>,
}

impl<T, S> ChunkFlusher<T, S>
where
    T: Clone + Send + Sync,
    S: BulkStore<T>,
{
    pub fn new(chunk_size: usize, store: S) -> Self {
        Self {
            chunk_size,
            store,
            write_timeout: None,
            observer: None,
        }
    }

    /// Bound every single chunk write, on top of the caller's deadline
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FlushObserver<T>>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn chunk_deadline(&self, ctx: &FlushContext) -> Option<Instant> {
        let local = self.write_timeout.map(|timeout| Instant::now() + timeout);
        match (ctx.deadline(), local) {
            (Some(caller), Some(local)) => Some(caller.min(local)),
            (caller, local) => caller.or(local),
        }
    }

    async fn write_chunk(&self, ctx: &FlushContext, chunk: &[T]) -> Result<()> {
        if ctx.is_expired() {
            return Err(ServiceError::Timeout(
                "deadline passed before chunk write started".to_string(),
            ));
        }

        match self.chunk_deadline(ctx) {
            None => self.store.add_many(chunk).await,
            Some(deadline) => timeout_at(deadline, self.store.add_many(chunk))
                .await
                .map_err(|_| ServiceError::Timeout("chunk write exceeded its deadline".to_string()))?,
        }
    }
}

#[async_trait]
impl<T, S> Flusher<T> for ChunkFlusher<T, S>
where
    T: Clone + Send + Sync,
    S: BulkStore<T>,
{
    async fn flush(&self, ctx: &FlushContext, items: &[T]) -> Vec<T> {
        let chunks = match split_to_chunks(Some(items), self.chunk_size) {
            Ok(chunks) => chunks,
            Err(err) => {
                event!(
                    Level::ERROR,
                    error = %err,
                    count = items.len(),
                    "collection could not be split, reporting all entities as unsaved"
                );
                return items.to_vec();
            }
        };

        let total = chunks.len();
        let mut failed_chunks = 0usize;
        let mut unsaved = Vec::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let span = info_span!("bulk_create", chunk = index, count = chunk.len());
            if let Err(err) = self.write_chunk(ctx, chunk).instrument(span).await {
                event!(
                    Level::WARN,
                    chunk = index,
                    count = chunk.len(),
                    error = %err,
                    "chunk wasn't saved"
                );
                if let Some(observer) = &self.observer {
                    observer.chunk_failed(index, &err);
                }
                failed_chunks += 1;
                unsaved.extend_from_slice(chunk);
            }
        }

        if failed_chunks > 0 {
            event!(
                Level::WARN,
                failed_chunks,
                total_chunks = total,
                unsaved = unsaved.len(),
                "bulk flush finished with failures"
            );
        } else {
            event!(Level::DEBUG, total_chunks = total, count = items.len(), "bulk flush finished");
        }

        unsaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::ServiceMetrics;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every chunk it receives and fails the calls listed in `fail_on`.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Vec<u32>>>,
        fail_on: HashSet<usize>,
        delay: Option<Duration>,
    }

    impl RecordingStore {
        fn failing(calls: &[usize]) -> Self {
            Self {
                fail_on: calls.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Vec<u32>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BulkStore<u32> for RecordingStore {
        async fn add_many(&self, items: &[u32]) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(items.to_vec());
                calls.len() - 1
            };
            if self.fail_on.contains(&call) {
                return Err(ServiceError::Storage("connection failed".to_string()));
            }
            Ok(())
        }
    }

    fn flusher(chunk_size: usize, store: RecordingStore) -> ChunkFlusher<u32, RecordingStore> {
        ChunkFlusher::new(chunk_size, store)
    }

    #[tokio::test]
    async fn test_all_chunks_succeed() {
        let flusher = flusher(2, RecordingStore::default());
        let unsaved = flusher.flush(&FlushContext::background(), &[1, 2, 3]).await;

        assert!(unsaved.is_empty());
        assert_eq!(flusher.store().calls(), vec![vec![1, 2], vec![3]]);
    }

    #[tokio::test]
    async fn test_first_chunk_fails_second_still_attempted() {
        let flusher = flusher(2, RecordingStore::failing(&[0]));
        let unsaved = flusher.flush(&FlushContext::background(), &[1, 2, 3, 4]).await;

        assert_eq!(unsaved, vec![1, 2]);
        assert_eq!(flusher.store().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_second_chunk_fails() {
        let flusher = flusher(2, RecordingStore::failing(&[1]));
        let unsaved = flusher.flush(&FlushContext::background(), &[1, 2, 3, 4]).await;

        assert_eq!(unsaved, vec![3, 4]);
        assert_eq!(flusher.store().calls(), vec![vec![1, 2], vec![3, 4]]);
    }

    #[tokio::test]
    async fn test_unsaved_keeps_input_order_across_chunks() {
        let flusher = flusher(2, RecordingStore::failing(&[0, 2]));
        let unsaved = flusher
            .flush(&FlushContext::background(), &[1, 2, 3, 4, 5])
            .await;

        assert_eq!(unsaved, vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn test_zero_chunk_size_returns_everything() {
        let flusher = flusher(0, RecordingStore::default());
        let unsaved = flusher.flush(&FlushContext::background(), &[1, 2, 3]).await;

        assert_eq!(unsaved, vec![1, 2, 3]);
        assert!(flusher.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_touches_nothing() {
        let flusher = flusher(3, RecordingStore::default());
        let unsaved = flusher.flush(&FlushContext::background(), &[]).await;

        assert!(unsaved.is_empty());
        assert!(flusher.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_observer_sees_failed_chunks() {
        let metrics = Arc::new(ServiceMetrics::new());
        let flusher = flusher(1, RecordingStore::failing(&[0, 2]))
            .with_observer(metrics.clone());

        flusher.flush(&FlushContext::background(), &[7, 8, 9]).await;
        assert_eq!(metrics.snapshot().chunks_failed, 2);
    }

    #[tokio::test]
    async fn test_expired_deadline_fails_without_calling_store() {
        let flusher = flusher(2, RecordingStore::default());
        let ctx = FlushContext::with_deadline(Instant::now());
        tokio::time::sleep(Duration::from_millis(1)).await;

        let unsaved = flusher.flush(&ctx, &[1, 2, 3]).await;
        assert_eq!(unsaved, vec![1, 2, 3]);
        assert!(flusher.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_write_timeout_fails_slow_chunk() {
        let store = RecordingStore {
            delay: Some(Duration::from_millis(200)),
            ..RecordingStore::default()
        };
        let flusher = flusher(5, store).with_write_timeout(Duration::from_millis(20));

        let unsaved = flusher.flush(&FlushContext::background(), &[1, 2]).await;
        assert_eq!(unsaved, vec![1, 2]);
    }
}
