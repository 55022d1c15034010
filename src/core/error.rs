use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Service '{0}' not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ServiceError {
    /// Whether a caller may reasonably retry the same request later.
    ///
    /// A full saver buffer drains on the next flush and storage or deadline
    /// failures may clear up on their own; everything else needs the
    /// request itself to change.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Capacity(_) | Self::Timeout(_) | Self::Storage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl<T> From<std::sync::PoisonError<T>> for ServiceError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
