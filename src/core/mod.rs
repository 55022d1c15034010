pub mod error;
pub mod event;
pub mod service;

pub use error::{Result, ServiceError};
pub use event::{ServiceEvent, ServiceEventType};
pub use service::Service;
