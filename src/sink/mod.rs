//! Batch Sink Module
//!
//! This module defines where flushed batches go:
//! - `BatchSink`: the narrow write contract used by the batch buffer
//! - `MemorySink`: keeps batches in process (dry runs and tests)
//! - `SqliteSink`: persists batches to a SQLite table

mod memory;
mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

use crate::{TransactionRecord, error::SinkError};
use async_trait::async_trait;

/// Durable destination for batches of transaction records
///
/// `write_batch` must be all-or-nothing: either every record in `records` is
/// stored, in order, or none is and an error is returned.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn write_batch(&self, records: &[TransactionRecord]) -> Result<(), SinkError>;
}
