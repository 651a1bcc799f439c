//! Memory Sink Module
//!
//! This module keeps flushed batches in process, for dry runs and tests.

use crate::{TransactionRecord, error::SinkError, sink::BatchSink};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-process sink that keeps every written batch
pub struct MemorySink {
    batches: RwLock<Vec<Vec<TransactionRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            batches: RwLock::new(Vec::new()),
        }
    }

    /// Every batch written so far, oldest first
    pub async fn batches(&self) -> Vec<Vec<TransactionRecord>> {
        self.batches.read().await.clone()
    }

    /// All written records flattened in write order
    pub async fn records(&self) -> Vec<TransactionRecord> {
        let batches = self.batches.read().await;
        batches.iter().flatten().cloned().collect()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchSink for MemorySink {
    async fn write_batch(&self, records: &[TransactionRecord]) -> Result<(), SinkError> {
        let mut batches = self.batches.write().await;
        batches.push(records.to_vec());
        Ok(())
    }
}
