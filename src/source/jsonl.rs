//! JSON Lines Source Module
//!
//! This module reads newline-delimited dumps of transaction/receipt pairs and
//! forwards the flattened records to the batch orchestrator.

use crate::{TransactionRecord, error::SourceError};
use ethers::types::{Transaction, TransactionReceipt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One line of a source dump
///
/// `transaction` and `receipt` use the Ethereum JSON-RPC encoding, as returned
/// by `eth_getTransactionByHash` and `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub transaction: Transaction,
    pub receipt: TransactionReceipt,
    #[serde(default)]
    pub trace: Option<String>,
    #[serde(default)]
    pub fail_reason: Option<String>,
}

impl SourceEntry {
    pub fn into_record(self) -> TransactionRecord {
        TransactionRecord::from_parts(&self.transaction, &self.receipt, self.trace, self.fail_reason)
    }
}

/// Outcome of reading a source to the end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSummary {
    /// Records handed to the orchestrator
    pub forwarded: u64,
    /// Malformed lines that were logged and dropped
    pub skipped: u64,
}

/// Reads transaction/receipt pairs from a newline-delimited JSON file
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Decode one raw line as UTF-8
    pub fn decode_line(line_number: usize, bytes: &[u8]) -> Result<&str, SourceError> {
        std::str::from_utf8(bytes).map_err(|source| SourceError::Encoding {
            line: line_number,
            source,
        })
    }

    /// Parse one line; blank lines yield `None`
    pub fn parse_line(line_number: usize, line: &str) -> Result<Option<TransactionRecord>, SourceError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let entry: SourceEntry = serde_json::from_str(line).map_err(|source| SourceError::Parse {
            line: line_number,
            source,
        })?;
        Ok(Some(entry.into_record()))
    }

    /// Send every record in the file to `records`, in file order
    ///
    /// Malformed lines, including lines that are not valid UTF-8, are
    /// skipped. Reading stops early if the receiving side has been dropped.
    ///
    /// # Returns
    /// * `Ok(SourceSummary)` with forwarded and skipped counts
    /// * `Err(SourceError::Io)` if the file cannot be opened or read
    pub async fn read_into(
        &self,
        records: mpsc::Sender<TransactionRecord>,
    ) -> Result<SourceSummary, SourceError> {
        info!(path = %self.path.display(), "Reading transaction source");
        let file = File::open(&self.path).await?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();

        let mut summary = SourceSummary::default();
        let mut line_number = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_number += 1;

            let parsed = Self::decode_line(line_number, &buf)
                .and_then(|line| Self::parse_line(line_number, line));
            let record = match parsed {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed source entry");
                    summary.skipped += 1;
                    continue;
                }
            };

            if records.send(record).await.is_err() {
                warn!(line = line_number, "Record receiver closed, stopping source");
                break;
            }
            summary.forwarded += 1;
        }

        debug!(lines = line_number, "Reached end of transaction source");
        info!(
            forwarded = summary.forwarded,
            skipped = summary.skipped,
            "Transaction source exhausted"
        );
        Ok(summary)
    }
}
