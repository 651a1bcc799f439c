//! Record Source Module
//!
//! This module feeds transaction records into the batcher. Records are read
//! from newline-delimited JSON dumps of transaction/receipt pairs and sent to
//! the batch orchestrator over a channel.

mod jsonl;
pub use jsonl::{JsonLinesSource, SourceEntry, SourceSummary};
