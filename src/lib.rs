//! This crate buffers blockchain transaction records in memory and writes
//! them to durable storage in batches.
//! It includes modules for the record type, the batch buffer and its
//! orchestrator, storage sinks, record sources, and configuration.

pub mod types; // Defines the transaction record and run statistics.
pub mod error; // Error types for batching, sinks, records and sources.
pub mod batch; // Fixed-capacity batch buffer and the task that owns it.
pub mod sink; // Destinations that accept whole batches.
pub mod source; // Readers that turn transaction dumps into records.
pub mod config; // Defines and loads system configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use batch::{BatchOrchestrator, TransactionBatch};
