use anyhow::Context;
use clap::Parser;
use ova_service::events::LogEventSink;
use ova_service::storage::{InMemoryServiceRepo, JournalServiceRepo, ServiceRepo};
use ova_service::{CreateServiceRequest, ServiceApi, ServiceConfig, ServiceError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Drive the buffered service write path against a local repository
#[derive(Parser, Debug)]
#[command(name = "ova-service", version)]
struct Cli {
    /// JSON config file; `OVA_*` environment variables are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append services to this JSON-lines journal instead of memory
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Services submitted one by one through the delayed saver
    #[arg(long, default_value_t = 20)]
    count: u64,

    /// Services created in a single bulk request
    #[arg(long, default_value_t = 12)]
    bulk: u64,

    /// Owner of the generated services
    #[arg(long, default_value_t = 1)]
    user_id: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServiceConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::from_env().context("loading config from environment")?,
    };

    let repo: Arc<dyn ServiceRepo> = match &cli.journal {
        Some(path) => Arc::new(JournalServiceRepo::open(path).await?),
        None => Arc::new(InMemoryServiceRepo::new()),
    };

    let api = ServiceApi::new(&config, Arc::clone(&repo), Arc::new(LogEventSink))?;
    info!(?config, "write path ready");

    for n in 0..cli.count {
        let request = CreateServiceRequest::new(cli.user_id, format!("service #{n}"))
            .description("submitted through the delayed saver");
        match api.create_service(request.clone()).await {
            Ok(_) => {}
            Err(err @ ServiceError::Capacity(_)) => {
                warn!(error = %err, "saver buffer full, flushing and retrying");
                api.flush_pending().await?;
                api.create_service(request).await?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if cli.bulk > 0 {
        let requests = (0..cli.bulk)
            .map(|n| {
                CreateServiceRequest::new(cli.user_id, format!("bulk service #{n}"))
                    .description("submitted in one bulk request")
            })
            .collect();
        let ids = api.multi_create_services(requests).await?;
        info!(created = ids.len(), "bulk create finished");
    }

    api.close().await?;

    let stored = repo.list_services(usize::MAX, 0).await?;
    info!(stored = stored.len(), "services in repository");
    println!("{}", serde_json::to_string_pretty(&api.metrics())?);

    Ok(())
}
