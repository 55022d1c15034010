//! Bulk persistence of entity collections.

pub mod chunked;

pub use chunked::ChunkFlusher;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline carried into a flush from its caller.
///
/// Request handlers pass their own deadline down; the delayed saver's worker
/// flushes with `FlushContext::background()`, which never expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushContext {
    deadline: Option<Instant>,
}

impl FlushContext {
    pub fn background() -> Self {
        Self { deadline: None }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Persists a collection and hands back whatever could not be persisted.
///
/// An empty result means every entity was stored. Failures are never raised:
/// the caller decides whether to retry the returned subset.
#[async_trait]
pub trait Flusher<T>: Send + Sync
where
    T: Clone + Send + Sync,
{
    async fn flush(&self, ctx: &FlushContext, items: &[T]) -> Vec<T>;
}

#[async_trait]
impl<T, F> Flusher<T> for Arc<F>
where
    T: Clone + Send + Sync,
    F: Flusher<T> + ?Sized,
{
    async fn flush(&self, ctx: &FlushContext, items: &[T]) -> Vec<T> {
        (**self).flush(ctx, items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_expires() {
        let ctx = FlushContext::background();
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_expired());
    }

    #[tokio::test]
    async fn test_past_deadline_is_expired() {
        let ctx = FlushContext::with_deadline(Instant::now());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(ctx.is_expired());
        assert!(!FlushContext::with_timeout(Duration::from_secs(60)).is_expired());
    }
}
