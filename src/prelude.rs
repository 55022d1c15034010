//! Recommended imports grouped by how much of the write path you wire yourself.
//!
//! `service` is the default for applications that just create and read
//! services. `pipeline` exposes the saver/flusher building blocks for callers
//! assembling their own write path over a custom store.

pub mod service {
    //! High-level surface: the service API facade and its inputs.
    pub use crate::api::{CreateServiceRequest, ServiceApi, ServiceUpdate, parse_service_id};
    pub use crate::config::ServiceConfig;
    pub use crate::core::{Result, Service, ServiceError};
    pub use crate::events::{EventSink, InMemoryEventSink, LogEventSink};
    pub use crate::storage::{InMemoryServiceRepo, JournalServiceRepo, ServiceRepo};
}

pub mod pipeline {
    //! Building blocks for a custom buffered write path.
    pub use crate::flusher::{ChunkFlusher, FlushContext, Flusher};
    pub use crate::observe::{FlushObserver, ServiceMetrics};
    pub use crate::saver::{DelayedSaver, SaverLifecycle};
    pub use crate::split::split_to_chunks;
    pub use crate::storage::BulkStore;
}
