//! Bounded write buffer with periodic background flushing.
//!
//! `DelayedSaver` accepts single entities on a fast path and hands them to a
//! `Flusher` in batches, either every flush interval or when it is closed.
//! The buffer has a fixed capacity; `save` on a full buffer is rejected with
//! `ServiceError::Capacity` instead of blocking, so callers see back-pressure
//! directly.
//!
//! Delivery through the saver is best effort. A successful `save` only means
//! the entity was buffered: entities the flusher reports as unsaved are
//! logged, passed to the observer and dropped. Callers that need to know what
//! was persisted should call the flusher themselves.

mod worker;

use crate::config::ServiceConfig;
use crate::core::{Result, ServiceError};
use crate::flusher::{FlushContext, Flusher};
use crate::observe::FlushObserver;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{Level, event};
use worker::{FlushWorker, spawn_flush_worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaverLifecycle {
    Uninitialized,
    Running,
    Closed,
}

struct SaverState<T> {
    lifecycle: SaverLifecycle,
    buffer: Vec<T>,
}

pub(crate) struct SaverShared<T, F> {
    capacity: usize,
    flush_interval: Duration,
    flusher: F,
    observer: Option<Arc<dyn FlushObserver<T>>>,
    state: Mutex<SaverState<T>>,
}

impl<T, F> SaverShared<T, F>
where
    T: Clone + Send + Sync,
    F: Flusher<T>,
{
    /// Swap the buffer for an empty one under the lock, then flush the taken
    /// contents with the lock released.
    pub(crate) async fn flush(&self, ctx: &FlushContext) -> Result<()> {
        let taken = {
            let mut state = self.state.lock()?;
            if state.buffer.is_empty() {
                return Ok(());
            }
            std::mem::replace(&mut state.buffer, Vec::with_capacity(self.capacity))
        };

        let unsaved = self.flusher.flush(ctx, &taken).await;
        if unsaved.is_empty() {
            event!(Level::DEBUG, count = taken.len(), "saver buffer flushed");
            return Ok(());
        }

        event!(
            Level::WARN,
            flushed = taken.len(),
            discarded = unsaved.len(),
            "some entities couldn't be saved and were discarded"
        );
        if let Some(observer) = &self.observer {
            observer.discarded(&unsaved);
        }
        Ok(())
    }
}

pub struct DelayedSaver<T, F> {
    shared: Arc<SaverShared<T, F>>,
    // Held across the worker's stop so every closer waits for the same shutdown.
    worker: tokio::sync::Mutex<Option<FlushWorker>>,
}

impl<T, F> DelayedSaver<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Flusher<T> + 'static,
{
    /// Create a saver in the `Uninitialized` state.
    ///
    /// Fails with `InvalidArgument` on a zero capacity or a zero interval.
    pub fn new(capacity: usize, flush_interval: Duration, flusher: F) -> Result<Self> {
        Self::with_observer(capacity, flush_interval, flusher, None)
    }

    pub fn with_observer(
        capacity: usize,
        flush_interval: Duration,
        flusher: F,
        observer: Option<Arc<dyn FlushObserver<T>>>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(ServiceError::InvalidArgument(
                "saver capacity must be > 0".to_string(),
            ));
        }
        if flush_interval.is_zero() {
            return Err(ServiceError::InvalidArgument(
                "saver flush interval must be > 0".to_string(),
            ));
        }

        Ok(Self {
            shared: Arc::new(SaverShared {
                capacity,
                flush_interval,
                flusher,
                observer,
                state: Mutex::new(SaverState {
                    lifecycle: SaverLifecycle::Uninitialized,
                    buffer: Vec::with_capacity(capacity),
                }),
            }),
            worker: tokio::sync::Mutex::new(None),
        })
    }

    pub fn from_config(
        config: &ServiceConfig,
        flusher: F,
        observer: Option<Arc<dyn FlushObserver<T>>>,
    ) -> Result<Self> {
        config.validate()?;
        Self::with_observer(
            config.saver_capacity,
            config.flush_interval_duration(),
            flusher,
            observer,
        )
    }

    /// Launch the background flush worker. Must run inside a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut worker = self
            .worker
            .try_lock()
            .map_err(|_| ServiceError::Lifecycle("saver is starting or closing".to_string()))?;
        {
            let mut state = self.shared.state.lock()?;
            match state.lifecycle {
                SaverLifecycle::Uninitialized => {}
                SaverLifecycle::Running => {
                    return Err(ServiceError::Lifecycle("saver already started".to_string()));
                }
                SaverLifecycle::Closed => {
                    return Err(ServiceError::Lifecycle("saver is closed".to_string()));
                }
            }
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(ServiceError::Lifecycle(
                    "saver must be started inside a Tokio runtime".to_string(),
                ));
            }
            state.lifecycle = SaverLifecycle::Running;
        }

        *worker = Some(spawn_flush_worker(Arc::clone(&self.shared)));
        event!(
            Level::INFO,
            capacity = self.shared.capacity,
            flush_interval_ms = self.shared.flush_interval.as_millis() as u64,
            "delayed saver started"
        );
        Ok(())
    }

    /// Buffer one entity for the next flush.
    pub fn save(&self, item: T) -> Result<()> {
        let mut state = self.shared.state.lock()?;
        if state.lifecycle != SaverLifecycle::Running {
            return Err(ServiceError::Lifecycle(format!(
                "saver is not running ({:?})",
                state.lifecycle
            )));
        }

        if state.buffer.len() == self.shared.capacity {
            return Err(ServiceError::Capacity(
                "local storage is full, wait for the next flush".to_string(),
            ));
        }

        state.buffer.push(item);
        Ok(())
    }

    /// Flush the buffer now instead of waiting for the next tick.
    pub async fn flush_now(&self, ctx: &FlushContext) -> Result<()> {
        self.ensure_running()?;
        self.shared.flush(ctx).await
    }

    /// Stop the worker, flushing whatever is still buffered.
    ///
    /// The final flush has completed when this returns, also for a caller
    /// that arrives while another close is still in progress. Closing an
    /// already closed saver is a no-op.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock()?;
            match state.lifecycle {
                SaverLifecycle::Uninitialized => {
                    return Err(ServiceError::Lifecycle("saver was never started".to_string()));
                }
                SaverLifecycle::Closed => {}
                SaverLifecycle::Running => state.lifecycle = SaverLifecycle::Closed,
            }
        }

        let mut worker = self.worker.lock().await;
        if let Some(worker) = worker.take() {
            worker.stop().await?;
            event!(Level::INFO, "delayed saver closed");
        }
        Ok(())
    }

    pub fn lifecycle(&self) -> Result<SaverLifecycle> {
        Ok(self.shared.state.lock()?.lifecycle)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn flush_interval(&self) -> Duration {
        self.shared.flush_interval
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.shared.state.lock()?.buffer.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the entities currently waiting for a flush
    pub fn buffered(&self) -> Result<Vec<T>> {
        Ok(self.shared.state.lock()?.buffer.clone())
    }

    fn ensure_running(&self) -> Result<()> {
        match self.lifecycle()? {
            SaverLifecycle::Running => Ok(()),
            other => Err(ServiceError::Lifecycle(format!(
                "saver is not running ({:?})",
                other
            ))),
        }
    }
}
