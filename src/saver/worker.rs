use super::SaverShared;
use crate::core::{Result, ServiceError};
use crate::flusher::{FlushContext, Flusher};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Level, event};

/// Background task that flushes the saver buffer on a fixed period.
///
/// On stop the task leaves its loop and runs one last flush before exiting,
/// so anything buffered before the stop signal is handed to the flusher.
pub(crate) struct FlushWorker {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl FlushWorker {
    /// Signals the worker to stop and waits for its final flush to finish.
    pub(crate) async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| ServiceError::Lifecycle(format!("flush worker join: {}", err)))?;
        }

        Ok(())
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        // Not aborted: the task still performs its final flush on its own.
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

pub(crate) fn spawn_flush_worker<T, F>(shared: Arc<SaverShared<T, F>>) -> FlushWorker
where
    T: Clone + Send + Sync + 'static,
    F: Flusher<T> + 'static,
{
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let period = shared.flush_interval;

    let join_handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = shared.flush(&FlushContext::background()).await {
                        event!(Level::ERROR, error = %err, "timer flush failed");
                    }
                }
            }
        }

        if let Err(err) = shared.flush(&FlushContext::background()).await {
            event!(Level::ERROR, error = %err, "final flush failed");
        }
        event!(Level::DEBUG, "flush worker stopped");
    });

    FlushWorker {
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}
