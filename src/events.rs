//! Outbound service event delivery.

use crate::core::{Result, ServiceEvent};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{Level, event};

/// Destination for create/update/delete notifications.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: &ServiceEvent) -> Result<()>;
}

/// Sink that keeps every event in memory, in send order.
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<ServiceEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ServiceEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn send(&self, service_event: &ServiceEvent) -> Result<()> {
        let payload = service_event.to_json()?;
        event!(
            Level::DEBUG,
            %payload,
            "service event recorded"
        );
        self.events.lock().await.push(service_event.clone());
        Ok(())
    }
}

/// Sink that only logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn send(&self, service_event: &ServiceEvent) -> Result<()> {
        let payload = service_event.to_json()?;
        event!(
            Level::INFO,
            %payload,
            "service event"
        );
        Ok(())
    }
}
