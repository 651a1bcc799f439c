//! Batch Orchestrator Module
//!
//! This module owns a `TransactionBatch` on behalf of a running process. Records
//! arrive over a channel, so producers never touch the buffer directly and the
//! buffer keeps a single writer.
//!
//! # Flush Triggers
//! 1. Size: the buffer reached capacity after an append
//! 2. Interval: the flush interval elapsed and the buffer is not empty
//! 3. Shutdown: every sender was dropped, residual records are flushed
//!
//! A failed flush is retried with a fixed backoff. The batch is left intact
//! between attempts, so a retry writes exactly the same records.

use crate::{
    BatchStats, TransactionRecord,
    batch::TransactionBatch,
    config::BatchConfig,
    error::BatchError,
    sink::BatchSink,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, error, info, warn};

/// Retry settings for a single flush
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    /// Total tries per flush, at least 1
    pub max_attempts: u32,
    /// Pause between tries
    pub retry_backoff: Duration,
}

impl FlushPolicy {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            max_attempts: config.max_flush_attempts,
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// Single owner of the transaction batch
pub struct BatchOrchestrator {
    /// Buffer of records awaiting a write
    batch: TransactionBatch,
    /// Durable destination for flushed batches
    sink: Arc<dyn BatchSink>,
    /// Retry behaviour for flushes
    policy: FlushPolicy,
    /// Period for flushing partial batches, `None` disables it
    flush_interval: Option<Duration>,
    /// Configured interval in milliseconds, 0 when disabled
    flush_interval_ms: u64,
    /// Running totals, returned when the run ends
    stats: BatchStats,
}

impl BatchOrchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    /// * `config` - Batch configuration (capacity, interval, retries)
    /// * `sink` - Destination for flushed batches
    ///
    /// # Returns
    /// `Err(BatchError::Configuration)` if capacity or flush attempts are zero
    pub fn new(config: &BatchConfig, sink: Arc<dyn BatchSink>) -> Result<Self, BatchError> {
        if config.max_flush_attempts == 0 {
            return Err(BatchError::Configuration(
                "max_flush_attempts must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            batch: TransactionBatch::new(config.capacity)?,
            sink,
            policy: FlushPolicy::from_config(config),
            flush_interval: config.flush_interval(),
            flush_interval_ms: config.flush_interval_ms,
            stats: BatchStats::default(),
        })
    }

    /// Run until every sender of `records` is dropped
    ///
    /// # Returns
    /// * `Ok(BatchStats)` once the channel closed and residual records were flushed
    /// * `Err(BatchError::SinkWrite)` if a flush failed on every attempt; the
    ///   records of that batch were not written
    pub async fn run(
        mut self,
        mut records: mpsc::Receiver<TransactionRecord>,
    ) -> Result<BatchStats, BatchError> {
        info!(
            capacity = self.batch.capacity(),
            flush_interval_ms = self.flush_interval_ms,
            max_flush_attempts = self.policy.max_attempts,
            "Batch orchestrator starting"
        );

        let mut ticker = self.flush_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                received = records.recv() => match received {
                    Some(record) => self.ingest(record).await?,
                    None => break,
                },
                _ = next_tick(&mut ticker) => {
                    if !self.batch.is_empty() {
                        debug!(count = self.batch.len(), "Flush interval elapsed");
                        self.flush_with_retry().await?;
                    }
                }
            }
        }

        // Senders are gone, drain whatever is left before exiting
        self.flush_with_retry().await?;

        info!(
            records_received = self.stats.records_received,
            batches_written = self.stats.batches_written,
            records_written = self.stats.records_written,
            "Batch orchestrator stopped"
        );
        Ok(self.stats)
    }

    /// Append a record and flush once the batch is full
    async fn ingest(&mut self, record: TransactionRecord) -> Result<(), BatchError> {
        self.stats.records_received += 1;
        self.batch.append(record)?;

        if self.batch.is_full() {
            debug!(count = self.batch.len(), "Batch full");
            self.flush_with_retry().await?;
        }
        Ok(())
    }

    /// Flush the batch, retrying with a fixed backoff
    async fn flush_with_retry(&mut self) -> Result<(), BatchError> {
        let mut attempt = 1;
        loop {
            match self.batch.flush(self.sink.as_ref()).await {
                Ok(0) => return Ok(()),
                Ok(written) => {
                    self.stats.batches_written += 1;
                    self.stats.records_written += written as u64;
                    info!(
                        batch = self.stats.batches_written,
                        records = written,
                        "Batch flushed"
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "Flush failed, retrying"
                    );
                    sleep(self.policy.retry_backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        attempts = attempt,
                        unflushed = self.batch.len(),
                        "Flush failed, giving up"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Waits for the next tick, or forever when interval flushing is disabled
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
