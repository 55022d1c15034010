//! Storage collaborators used by the write path.

pub mod journal;
pub mod memory;

pub use journal::JournalServiceRepo;
pub use memory::InMemoryServiceRepo;

use crate::core::{Result, Service};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Bulk write target for a chunk of entities.
///
/// Implementations must accept repeated calls with disjoint chunks of the same
/// logical batch without disturbing chunks already written.
#[async_trait]
pub trait BulkStore<T: Sync>: Send + Sync {
    async fn add_many(&self, items: &[T]) -> Result<()>;
}

#[async_trait]
impl<T, S> BulkStore<T> for Arc<S>
where
    T: Sync,
    S: BulkStore<T> + ?Sized,
{
    async fn add_many(&self, items: &[T]) -> Result<()> {
        (**self).add_many(items).await
    }
}

/// Full service repository: bulk insert plus the read/update/remove paths.
#[async_trait]
pub trait ServiceRepo: BulkStore<Service> {
    /// Page through stored services. A zero `limit` or an `offset` past the
    /// end yields an empty page.
    async fn list_services(&self, limit: usize, offset: usize) -> Result<Vec<Service>>;

    async fn describe_service(&self, id: Uuid) -> Result<Service>;

    /// Replace the stored service that has the same id.
    async fn update_service(&self, service: &Service) -> Result<()>;

    async fn remove_service(&self, id: Uuid) -> Result<()>;
}

pub(crate) fn page(services: &[Service], limit: usize, offset: usize) -> Vec<Service> {
    if limit == 0 || offset >= services.len() {
        return Vec::new();
    }
    let end = offset.saturating_add(limit).min(services.len());
    services[offset..end].to_vec()
}
