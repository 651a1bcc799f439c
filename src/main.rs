use txbatch::{
    BatchOrchestrator,
    config::Config,
    sink::SqliteSink,
    source::JsonLinesSource,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// The main entry point for the batcher.
///
/// Loads the configuration, connects the SQLite sink, then streams records
/// from the configured source through the batch orchestrator. Residual
/// records are flushed before the process exits.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level is taken from RUST_LOG, defaulting to info.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!("Batcher starting with config: {:?}", config);

    let sink = Arc::new(SqliteSink::connect(&config.database.url, config.database.max_connections).await?);
    let orchestrator = BatchOrchestrator::new(&config.batch, sink.clone())?;

    // Bounded to one batch so a slow sink holds the reader back
    let (tx, rx) = mpsc::channel(config.batch.capacity);
    let source = JsonLinesSource::new(&config.source.path);
    let reader = tokio::spawn(async move { source.read_into(tx).await });

    let stats = orchestrator.run(rx).await;

    let summary = reader.await?;
    if let Err(e) = &summary {
        error!("Transaction source error: {:?}", e);
    }

    let stored = sink.count().await;
    sink.close().await;

    let stats = stats?;
    let stored = stored?;
    info!(
        records_written = stats.records_written,
        batches_written = stats.batches_written,
        total_stored = stored,
        "Batcher finished"
    );
    summary?;
    Ok(())
}
