/// Service API tests
///
/// Covers the create/multi-create/update/remove flows of `ServiceApi`
/// over in-memory and journal repositories.
/// Run with: cargo test --test api_tests

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, FixedOffset, Utc};
use ova_service::events::InMemoryEventSink;
use ova_service::storage::{BulkStore, InMemoryServiceRepo, JournalServiceRepo, ServiceRepo};
use ova_service::{
    CreateServiceRequest, Result, Service, ServiceApi, ServiceConfig, ServiceError,
    ServiceEventType, ServiceUpdate,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn config() -> ServiceConfig {
    ServiceConfig::new()
        .saver_capacity(3)
        .flush_interval(Duration::from_secs(60))
        .chunk_size(2)
}

fn setup(config: &ServiceConfig) -> (ServiceApi, Arc<InMemoryServiceRepo>, Arc<InMemoryEventSink>) {
    let repo = Arc::new(InMemoryServiceRepo::new());
    let sink = Arc::new(InMemoryEventSink::new());
    let api = ServiceApi::new(config, repo.clone(), sink.clone()).unwrap();
    (api, repo, sink)
}

/// Repository whose bulk insert always fails; reads are delegated.
struct BrokenInsertRepo {
    inner: InMemoryServiceRepo,
}

#[async_trait]
impl BulkStore<Service> for BrokenInsertRepo {
    async fn add_many(&self, _items: &[Service]) -> Result<()> {
        Err(ServiceError::Storage("database is down".to_string()))
    }
}

#[async_trait]
impl ServiceRepo for BrokenInsertRepo {
    async fn list_services(&self, limit: usize, offset: usize) -> Result<Vec<Service>> {
        self.inner.list_services(limit, offset).await
    }

    async fn describe_service(&self, id: Uuid) -> Result<Service> {
        self.inner.describe_service(id).await
    }

    async fn update_service(&self, service: &Service) -> Result<()> {
        self.inner.update_service(service).await
    }

    async fn remove_service(&self, id: Uuid) -> Result<()> {
        self.inner.remove_service(id).await
    }
}

#[tokio::test]
async fn test_create_is_buffered_until_close() {
    let (api, repo, sink) = setup(&config());

    let id = api
        .create_service(CreateServiceRequest::new(1, "Car service").address("Main st. 1"))
        .await
        .unwrap();

    assert_eq!(api.pending().unwrap(), 1);
    assert!(repo.is_empty().await);

    api.close().await.unwrap();

    assert_eq!(api.describe_service(id).await.unwrap().service_name, "Car service");
    let events = sink.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, ServiceEventType::Create);
    assert_eq!(events[0].service_id, id);
    assert_eq!(api.metrics().create_succeeded, 1);
}

#[tokio::test]
async fn test_create_surfaces_back_pressure() {
    let (api, _repo, sink) = setup(&config());

    for n in 0..3 {
        api.create_service(CreateServiceRequest::new(1, format!("service {n}")))
            .await
            .unwrap();
    }
    let err = api
        .create_service(CreateServiceRequest::new(1, "one too many"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Capacity(_)));
    assert_eq!(sink.events().await.len(), 3);
    assert_eq!(api.metrics().create_succeeded, 3);

    api.flush_pending().await.unwrap();
    api.create_service(CreateServiceRequest::new(1, "after flush"))
        .await
        .unwrap();
    api.close().await.unwrap();
}

#[tokio::test]
async fn test_create_rejects_invalid_request() {
    let (api, _repo, _sink) = setup(&config());

    let err = api
        .create_service(CreateServiceRequest::new(0, "nobody's service"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(api.pending().unwrap(), 0);

    api.close().await.unwrap();
}

#[tokio::test]
async fn test_multi_create_bypasses_saver() {
    let (api, repo, _sink) = setup(&config());

    let requests = (0..5)
        .map(|n| CreateServiceRequest::new(2, format!("bulk {n}")))
        .collect();
    let ids = api.multi_create_services(requests).await.unwrap();

    assert_eq!(ids.len(), 5);
    assert_eq!(api.pending().unwrap(), 0);
    let stored: Vec<Uuid> = repo.all().await.iter().map(|s| s.id).collect();
    assert_eq!(stored, ids);
    assert_eq!(api.metrics().multi_create_succeeded, 1);

    api.close().await.unwrap();
}

#[tokio::test]
async fn test_multi_create_rejects_empty_and_invalid() {
    let (api, repo, _sink) = setup(&config());

    assert!(matches!(
        api.multi_create_services(Vec::new()).await,
        Err(ServiceError::InvalidInput(_))
    ));

    let past = (Utc::now() - ChronoDuration::hours(1)).fixed_offset();
    let requests = vec![
        CreateServiceRequest::new(1, "fine"),
        CreateServiceRequest::new(1, "late").when(past),
    ];
    let err = api.multi_create_services(requests).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("#1")));
    assert!(repo.is_empty().await);

    api.close().await.unwrap();
}

#[tokio::test]
async fn test_multi_create_reports_storage_failure() {
    let repo = Arc::new(BrokenInsertRepo {
        inner: InMemoryServiceRepo::new(),
    });
    let api = ServiceApi::new(&config(), repo, Arc::new(InMemoryEventSink::new())).unwrap();

    let requests = (0..3)
        .map(|n| CreateServiceRequest::new(1, format!("bulk {n}")))
        .collect();
    let err = api.multi_create_services(requests).await.unwrap_err();

    assert!(matches!(err, ServiceError::Storage(msg) if msg.contains("3 of 3")));
    let metrics = api.metrics();
    assert_eq!(metrics.chunks_failed, 2);
    assert_eq!(metrics.multi_create_succeeded, 0);

    api.close().await.unwrap();
}

#[tokio::test]
async fn test_delayed_failures_are_invisible_to_creators() {
    let repo = Arc::new(BrokenInsertRepo {
        inner: InMemoryServiceRepo::new(),
    });
    let api = ServiceApi::new(&config(), repo, Arc::new(InMemoryEventSink::new())).unwrap();

    api.create_service(CreateServiceRequest::new(1, "lost"))
        .await
        .unwrap();
    api.close().await.unwrap();

    assert_eq!(api.metrics().create_succeeded, 1);
    assert_eq!(api.metrics().entities_discarded, 1);
}

#[tokio::test]
async fn test_update_and_remove() {
    let (api, _repo, sink) = setup(&config());
    let ids = api
        .multi_create_services(vec![CreateServiceRequest::new(5, "Car service")])
        .await
        .unwrap();
    let id = ids[0];

    let when = (Utc::now() + ChronoDuration::days(2))
        .with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
    let updated = api
        .update_service(id, ServiceUpdate::Calendar(Some(when)))
        .await
        .unwrap();
    assert_eq!(updated.when_local, Some(when));
    assert_eq!(api.describe_service(id).await.unwrap(), updated);

    api.update_service(id, ServiceUpdate::Description("weekly".to_string()))
        .await
        .unwrap();
    assert_eq!(api.describe_service(id).await.unwrap().description, "weekly");

    api.remove_service(id).await.unwrap();
    assert!(matches!(
        api.describe_service(id).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        api.remove_service(id).await,
        Err(ServiceError::NotFound(_))
    ));

    let types: Vec<_> = sink.events().await.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![ServiceEventType::Update, ServiceEventType::Update, ServiceEventType::Delete]
    );
    let metrics = api.metrics();
    assert_eq!(metrics.update_succeeded, 2);
    assert_eq!(metrics.remove_succeeded, 1);

    api.close().await.unwrap();
}

#[tokio::test]
async fn test_list_pages() {
    let (api, _repo, _sink) = setup(&config());
    let requests = (0..5)
        .map(|n| CreateServiceRequest::new(1, format!("svc {n}")))
        .collect();
    api.multi_create_services(requests).await.unwrap();

    assert_eq!(api.list_services(2, 0).await.unwrap().len(), 2);
    assert_eq!(api.list_services(2, 4).await.unwrap().len(), 1);
    assert!(api.list_services(0, 0).await.unwrap().is_empty());
    assert!(api.list_services(3, 9).await.unwrap().is_empty());

    api.close().await.unwrap();
}

#[tokio::test]
async fn test_journal_backed_api_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("services.jsonl");

    let created = {
        let repo = Arc::new(JournalServiceRepo::open(&path).await.unwrap());
        let api = ServiceApi::new(&config(), repo, Arc::new(InMemoryEventSink::new())).unwrap();
        let id = api
            .create_service(CreateServiceRequest::new(3, "journaled"))
            .await
            .unwrap();
        api.close().await.unwrap();
        id
    };

    let reopened = JournalServiceRepo::open(&path).await.unwrap();
    assert_eq!(
        reopened.describe_service(created).await.unwrap().service_name,
        "journaled"
    );
}
