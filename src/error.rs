//! Error types shared across the batcher.

use thiserror::Error;

/// Errors raised by [`TransactionBatch`](crate::batch::TransactionBatch) and
/// its orchestrator.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Append was called on a buffer whose live count equals its capacity.
    #[error("batch buffer is full ({capacity} records), flush before appending")]
    BufferFull { capacity: usize },

    /// The sink rejected the batch. The buffer still holds every live record.
    #[error("failed to write batch to sink: {0}")]
    SinkWrite(#[source] SinkError),

    /// Invalid settings at construction time.
    #[error("invalid batch configuration: {0}")]
    Configuration(String),
}

/// Errors raised by a [`BatchSink`](crate::sink::BatchSink).
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Raised when a record is built with a mandatory field missing.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("transaction record is missing field `{0}`")]
    MissingField(&'static str),
}

/// Errors raised while reading transaction/receipt pairs from a source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line} is not valid UTF-8: {source}")]
    Encoding {
        line: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("malformed entry on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
