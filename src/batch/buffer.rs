//! Transaction Batch Module
//!
//! This module holds transaction records in memory until they are written to
//! durable storage as a single batch.

use crate::{
    TransactionRecord,
    error::BatchError,
    sink::BatchSink,
};
use tracing::{debug, warn};

/// Default number of records held before a batch must be drained
pub const DEFAULT_CAPACITY: usize = 50;

/// Fixed-capacity buffer of transaction records
///
/// Records are kept in insertion order. The buffer never flushes on its own:
/// the owner checks [`is_full`](Self::is_full) and calls
/// [`flush`](Self::flush) when it decides the batch is ready.
#[derive(Debug)]
pub struct TransactionBatch {
    /// Maximum number of live records
    capacity: usize,
    /// Live records, pre-allocated to `capacity` and reused across batches
    records: Vec<TransactionRecord>,
}

impl TransactionBatch {
    /// Creates an empty batch
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of records, must be positive
    ///
    /// # Returns
    /// `Err(BatchError::Configuration)` if `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self, BatchError> {
        if capacity == 0 {
            return Err(BatchError::Configuration(
                "batch capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            records: Vec::with_capacity(capacity),
        })
    }

    /// Append a record at the end of the batch
    ///
    /// # Returns
    /// `Err(BatchError::BufferFull)` if the batch already holds `capacity`
    /// records. The batch is left unchanged in that case.
    pub fn append(&mut self, record: TransactionRecord) -> Result<(), BatchError> {
        if self.is_full() {
            warn!(capacity = self.capacity, tx_hash = record.hash(), "Append rejected, batch is full");
            return Err(BatchError::BufferFull {
                capacity: self.capacity,
            });
        }

        self.records.push(record);
        Ok(())
    }

    /// `true` once the live count has reached capacity
    pub fn is_full(&self) -> bool {
        self.records.len() == self.capacity
    }

    /// Write every live record to `sink` as one batch
    ///
    /// On success the batch is emptied and the number of records written is
    /// returned. On failure nothing is cleared, so the identical batch can be
    /// retried. An empty batch is not sent to the sink.
    pub async fn flush<S>(&mut self, sink: &S) -> Result<usize, BatchError>
    where
        S: BatchSink + ?Sized,
    {
        if self.records.is_empty() {
            return Ok(0);
        }

        let count = self.records.len();
        debug!(count, "Flushing transaction batch");

        sink.write_batch(&self.records)
            .await
            .map_err(BatchError::SinkWrite)?;

        // Keeps the allocation for the next batch
        self.records.clear();
        Ok(count)
    }

    /// Discard every live record without writing it anywhere
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live records in insertion order
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }
}
