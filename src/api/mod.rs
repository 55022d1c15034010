//! Caller-facing service API.
//!
//! Single creates go through the delayed saver: a successful
//! `create_service` means the service was buffered, not that it reached the
//! repository. Bulk creates bypass the saver and report failure when any
//! chunk could not be stored.

mod requests;

pub use requests::{CreateServiceRequest, ServiceUpdate, parse_service_id};

use crate::config::ServiceConfig;
use crate::core::{Result, Service, ServiceError, ServiceEvent};
use crate::events::EventSink;
use crate::flusher::{ChunkFlusher, FlushContext, Flusher};
use crate::observe::{FlushObserver, MetricsSnapshot, ServiceMetrics};
use crate::saver::DelayedSaver;
use crate::storage::ServiceRepo;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, event};
use uuid::Uuid;

type SharedFlusher = Arc<dyn Flusher<Service>>;

pub struct ServiceApi {
    repo: Arc<dyn ServiceRepo>,
    flusher: SharedFlusher,
    saver: DelayedSaver<Service, SharedFlusher>,
    events: Arc<dyn EventSink>,
    metrics: Arc<ServiceMetrics>,
    request_timeout: Option<Duration>,
}

impl ServiceApi {
    /// Wire the write path over `repo` and start the delayed saver.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        config: &ServiceConfig,
        repo: Arc<dyn ServiceRepo>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(ServiceMetrics::new());
        let mut chunk_flusher = ChunkFlusher::<Service, _>::new(config.chunk_size, Arc::clone(&repo))
            .with_observer(metrics.clone() as Arc<dyn FlushObserver<Service>>);
        if let Some(timeout) = config.write_timeout_duration() {
            chunk_flusher = chunk_flusher.with_write_timeout(timeout);
        }
        let flusher: SharedFlusher = Arc::new(chunk_flusher);

        let saver = DelayedSaver::from_config(
            config,
            Arc::clone(&flusher),
            Some(metrics.clone() as Arc<dyn FlushObserver<Service>>),
        )?;
        saver.start()?;

        Ok(Self {
            repo,
            flusher,
            saver,
            events,
            metrics,
            request_timeout: None,
        })
    }

    /// Deadline applied to the storage writes of each bulk create
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub async fn create_service(&self, request: CreateServiceRequest) -> Result<Uuid> {
        event!(Level::DEBUG, user_id = request.user_id, "create_service called");

        let service = request.into_service()?;
        let id = service.id;
        self.saver.save(service)?;

        self.events.send(&ServiceEvent::created(id)).await?;
        self.metrics.increment_create();
        Ok(id)
    }

    /// Persist a batch right away through the bulk flusher.
    ///
    /// Fails with `Storage` if any chunk could not be written; chunks written
    /// before or after the failed one stay stored.
    pub async fn multi_create_services(
        &self,
        requests: Vec<CreateServiceRequest>,
    ) -> Result<Vec<Uuid>> {
        event!(Level::DEBUG, count = requests.len(), "multi_create_services called");

        if requests.is_empty() {
            return Err(ServiceError::InvalidInput("empty service list".to_string()));
        }

        let services = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| {
                request.into_service().map_err(|err| {
                    ServiceError::Validation(format!("service #{}: {}", index, err))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let ctx = self
            .request_timeout
            .map(FlushContext::with_timeout)
            .unwrap_or_default();
        let unsaved = self.flusher.flush(&ctx, &services).await;
        if !unsaved.is_empty() {
            let err = ServiceError::Storage(format!(
                "can't save all services properly, {} of {} services were discarded",
                unsaved.len(),
                services.len()
            ));
            event!(Level::ERROR, error = %err, "multi_create_services failed");
            return Err(err);
        }

        self.metrics.increment_multi_create();
        Ok(services.iter().map(|service| service.id).collect())
    }

    pub async fn describe_service(&self, id: Uuid) -> Result<Service> {
        self.repo.describe_service(id).await
    }

    pub async fn list_services(&self, limit: usize, offset: usize) -> Result<Vec<Service>> {
        self.repo.list_services(limit, offset).await
    }

    pub async fn update_service(&self, id: Uuid, update: ServiceUpdate) -> Result<Service> {
        let mut service = self.repo.describe_service(id).await?;
        update.apply(&mut service)?;
        self.repo.update_service(&service).await?;

        self.events.send(&ServiceEvent::updated(id)).await?;
        self.metrics.increment_update();
        Ok(service)
    }

    pub async fn remove_service(&self, id: Uuid) -> Result<()> {
        self.repo.remove_service(id).await?;

        self.events.send(&ServiceEvent::deleted(id)).await?;
        self.metrics.increment_remove();
        Ok(())
    }

    /// Number of created services still waiting in the saver buffer
    pub fn pending(&self) -> Result<usize> {
        self.saver.len()
    }

    /// Flush the saver buffer without waiting for its timer.
    pub async fn flush_pending(&self) -> Result<()> {
        let ctx = self
            .request_timeout
            .map(FlushContext::with_timeout)
            .unwrap_or_default();
        self.saver.flush_now(&ctx).await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Close the saver, flushing anything still buffered.
    pub async fn close(&self) -> Result<()> {
        self.saver.close().await
    }
}
