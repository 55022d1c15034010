use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceEventType {
    Create,
    Update,
    Delete,
}

/// Create/update/delete notification for a single service.
///
/// Only the service id travels with the event; consumers look the entity up
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEvent {
    pub event_id: Uuid,
    pub event_type: ServiceEventType,
    pub service_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl ServiceEvent {
    pub fn new(event_type: ServiceEventType, service_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            service_id,
            timestamp: Utc::now(),
        }
    }

    pub fn created(service_id: Uuid) -> Self {
        Self::new(ServiceEventType::Create, service_id)
    }

    pub fn updated(service_id: Uuid) -> Self {
        Self::new(ServiceEventType::Update, service_id)
    }

    pub fn deleted(service_id: Uuid) -> Self {
        Self::new(ServiceEventType::Delete, service_id)
    }

    pub fn to_json(&self) -> crate::core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
