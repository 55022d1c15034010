use super::{BulkStore, ServiceRepo, page};
use crate::core::{Result, Service, ServiceError};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{Level, event};
use uuid::Uuid;

/// Service repository kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryServiceRepo {
    services: RwLock<Vec<Service>>,
}

impl InMemoryServiceRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with `services`
    pub fn with_services(services: Vec<Service>) -> Self {
        Self {
            services: RwLock::new(services),
        }
    }

    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.services.read().await.is_empty()
    }

    /// Copy of every stored service in insertion order
    pub async fn all(&self) -> Vec<Service> {
        self.services.read().await.clone()
    }
}

#[async_trait]
impl BulkStore<Service> for InMemoryServiceRepo {
    async fn add_many(&self, items: &[Service]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut services = self.services.write().await;
        services.extend_from_slice(items);
        event!(Level::DEBUG, count = items.len(), "services added to memory repo");
        Ok(())
    }
}

#[async_trait]
impl ServiceRepo for InMemoryServiceRepo {
    async fn list_services(&self, limit: usize, offset: usize) -> Result<Vec<Service>> {
        let services = self.services.read().await;
        Ok(page(&services, limit, offset))
    }

    async fn describe_service(&self, id: Uuid) -> Result<Service> {
        let services = self.services.read().await;
        services
            .iter()
            .find(|service| service.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    async fn update_service(&self, service: &Service) -> Result<()> {
        let mut services = self.services.write().await;
        let slot = services
            .iter_mut()
            .find(|stored| stored.id == service.id)
            .ok_or_else(|| ServiceError::NotFound(service.id.to_string()))?;
        *slot = service.clone();
        Ok(())
    }

    async fn remove_service(&self, id: Uuid) -> Result<()> {
        let mut services = self.services.write().await;
        let index = services
            .iter()
            .position(|service| service.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        services.remove(index);
        event!(Level::DEBUG, %id, "service removed from memory repo");
        Ok(())
    }
}
