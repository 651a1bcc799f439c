//! Batch Module
//!
//! This module handles buffering of transaction records:
//! - TransactionBatch: Fixed-capacity buffer drained into a sink as one write
//! - BatchOrchestrator: Owns a batch and decides when it is flushed

mod buffer;
pub mod orchestrator;


pub use buffer::{DEFAULT_CAPACITY, TransactionBatch};
pub use orchestrator::{BatchOrchestrator, FlushPolicy};
