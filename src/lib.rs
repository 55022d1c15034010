// ============================================================================
// ova-service: buffered write path for service entities
// ============================================================================
//
// Two ways in:
// - single entities are buffered by `DelayedSaver` and flushed in the
//   background on a timer and on close;
// - whole collections go straight to a `Flusher`, which writes them in
//   fixed-size chunks and reports which entities could not be stored.

pub mod api;
pub mod config;
pub mod core;
pub mod events;
pub mod flusher;
pub mod observe;
pub mod prelude;
pub mod saver;
pub mod split;
pub mod storage;

// Re-export main types for convenience
pub use api::{CreateServiceRequest, ServiceApi, ServiceUpdate};
pub use config::ServiceConfig;
pub use core::{Result, Service, ServiceError, ServiceEvent, ServiceEventType};
pub use flusher::{ChunkFlusher, FlushContext, Flusher};
pub use observe::{FlushObserver, MetricsSnapshot, ServiceMetrics};
pub use saver::{DelayedSaver, SaverLifecycle};
pub use split::split_to_chunks;
pub use storage::{BulkStore, InMemoryServiceRepo, JournalServiceRepo, ServiceRepo};
