//! Append-only JSON-lines service repository.
//!
//! Each `add_many` call appends one line per service and syncs before
//! returning, so a chunk is either fully on disk or reported as failed.
//! Updates and removals rewrite the whole file through a temporary sibling
//! and an atomic rename.
//!
//! File writes are synchronous and happen after the last await point of each
//! operation. A caller that drops the future (for example on a write timeout)
//! therefore leaves the file and the in-memory copy both untouched.

use super::{BulkStore, ServiceRepo, page};
use crate::core::{Result, Service, ServiceError};
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{Level, event};
use uuid::Uuid;

#[derive(Debug)]
pub struct JournalServiceRepo {
    path: PathBuf,
    services: RwLock<Vec<Service>>,
}

impl JournalServiceRepo {
    /// Open the journal at `path`, replaying it if it already exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let services = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read_to_string(&path).await?;
            parse_journal(&raw)?
        } else {
            Vec::new()
        };

        event!(
            Level::INFO,
            path = %path.display(),
            replayed = services.len(),
            "service journal opened"
        );

        Ok(Self {
            path,
            services: RwLock::new(services),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.services.read().await.is_empty()
    }

    fn rewrite(&self, services: &[Service]) -> Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(encode_lines(services)?.as_bytes())?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Append `payload` to the journal, truncating back to the previous length
/// if any part of the write fails.
fn append_lines(path: &Path, payload: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let committed = file.metadata()?.len();

    if let Err(err) = file.write_all(payload).and_then(|()| file.sync_data()) {
        if let Err(rollback) = file.set_len(committed) {
            event!(
                Level::ERROR,
                path = %path.display(),
                error = %rollback,
                "journal rollback failed, file may hold a partial line"
            );
        }
        return Err(err.into());
    }
    Ok(())
}

fn parse_journal(raw: &str) -> Result<Vec<Service>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).map_err(|err| {
                ServiceError::Serialization(format!("journal line {}: {}", number + 1, err))
            })
        })
        .collect()
}

fn encode_lines(services: &[Service]) -> Result<String> {
    let mut out = String::new();
    for service in services {
        out.push_str(&serde_json::to_string(service)?);
        out.push('\n');
    }
    Ok(out)
}

#[async_trait]
impl BulkStore<Service> for JournalServiceRepo {
    async fn add_many(&self, items: &[Service]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let payload = encode_lines(items)?;
        let mut services = self.services.write().await;

        append_lines(&self.path, payload.as_bytes())?;
        services.extend_from_slice(items);
        event!(Level::DEBUG, count = items.len(), "services appended to journal");
        Ok(())
    }
}

#[async_trait]
impl ServiceRepo for JournalServiceRepo {
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
        let index = services
            .iter()
            .position(|stored| stored.id == service.id)
            .ok_or_else(|| ServiceError::NotFound(service.id.to_string()))?;

        let mut next = services.clone();
        next[index] = service.clone();
        self.rewrite(&next)?;
        *services = next;
        Ok(())
    }

    async fn remove_service(&self, id: Uuid) -> Result<()> {
        let mut services = self.services.write().await;
        let index = services
            .iter()
            .position(|service| service.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        let mut next = services.clone();
        next.remove(index);
        self.rewrite(&next)?;
        *services = next;
        Ok(())
    }
}
