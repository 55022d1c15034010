//! Write path configuration.

use crate::core::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_SAVER_CAPACITY: &str = "OVA_SAVER_CAPACITY";
pub const ENV_FLUSH_INTERVAL_MS: &str = "OVA_FLUSH_INTERVAL_MS";
pub const ENV_CHUNK_SIZE: &str = "OVA_CHUNK_SIZE";
pub const ENV_WRITE_TIMEOUT_MS: &str = "OVA_WRITE_TIMEOUT_MS";

fn default_saver_capacity() -> usize { 10 }
fn default_flush_interval_ms() -> u64 { 1_000 }
fn default_chunk_size() -> usize { 5 }

/// Sizing and timing for the delayed saver and the bulk flusher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Maximum number of services buffered by the delayed saver
    #[serde(default = "default_saver_capacity")]
    pub saver_capacity: usize,

    /// Period of the saver's background flush in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Number of services written per storage call
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Upper bound for a single chunk write in milliseconds
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self {
            saver_capacity: default_saver_capacity(),
            flush_interval_ms: default_flush_interval_ms(),
            chunk_size: default_chunk_size(),
            write_timeout_ms: None,
        }
    }

    /// Set the saver buffer capacity
    pub fn saver_capacity(mut self, capacity: usize) -> Self {
        self.saver_capacity = capacity;
        self
    }

    /// Set the background flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the flusher chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the per-chunk write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn flush_interval_duration(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn write_timeout_duration(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.saver_capacity == 0 {
            return Err(ServiceError::InvalidArgument(
                "saver_capacity must be > 0".to_string(),
            ));
        }

        if self.flush_interval_ms == 0 {
            return Err(ServiceError::InvalidArgument(
                "flush_interval_ms must be > 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(ServiceError::InvalidArgument(
                "chunk_size must be > 0".to_string(),
            ));
        }

        if self.write_timeout_ms == Some(0) {
            return Err(ServiceError::InvalidArgument(
                "write_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Build from `OVA_*` environment variables layered over the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new();

        if let Some(raw) = lookup(ENV_SAVER_CAPACITY) {
            config.saver_capacity = parse_var(ENV_SAVER_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FLUSH_INTERVAL_MS) {
            config.flush_interval_ms = parse_var(ENV_FLUSH_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CHUNK_SIZE) {
            config.chunk_size = parse_var(ENV_CHUNK_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_WRITE_TIMEOUT_MS) {
            config.write_timeout_ms = Some(parse_var(ENV_WRITE_TIMEOUT_MS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        ServiceError::InvalidArgument(format!("{key} has malformed value '{raw}'"))
    })
}
