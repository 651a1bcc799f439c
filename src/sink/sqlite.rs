//! SQLite Batch Sink
//!
//! Persists each flushed batch inside a single SQL transaction so a batch is
//! either fully stored or not stored at all.
//!
//! # Storage
//! One row per transaction record in the `transactions` table, plus:
//! - `batch_id`: sequential batch number, continuing from the highest stored
//! - `flushed_at`: UTC time of the write (RFC 3339)

use crate::{TransactionRecord, error::SinkError, sink::BatchSink};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id INTEGER NOT NULL,
    flushed_at TEXT NOT NULL,
    block_hash TEXT NOT NULL,
    block_number TEXT NOT NULL,
    hash TEXT NOT NULL,
    transaction_index TEXT NOT NULL,
    nonce TEXT NOT NULL,
    from_address TEXT NOT NULL,
    to_address TEXT NOT NULL,
    value TEXT NOT NULL,
    gas TEXT NOT NULL,
    gas_price TEXT NOT NULL,
    input TEXT NOT NULL,
    trace TEXT NOT NULL,
    contract_address TEXT NOT NULL,
    cumulative_gas_used TEXT NOT NULL,
    gas_used TEXT NOT NULL,
    status TEXT NOT NULL,
    fail_reason TEXT NOT NULL
)";

const INSERT_RECORD: &str = "INSERT INTO transactions (
    batch_id, flushed_at, block_hash, block_number, hash, transaction_index, nonce,
    from_address, to_address, value, gas, gas_price, input, trace,
    contract_address, cumulative_gas_used, gas_used, status, fail_reason
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Batch sink backed by a SQLite database
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Connect to the database at `url`, creating the file if missing
    ///
    /// # Arguments
    /// * `url` - Database URL (e.g. "sqlite://transactions.db" or "sqlite::memory:")
    /// * `max_connections` - Pool size; use 1 for in-memory databases so every
    ///   query sees the same database
    #[tracing::instrument(level = "info")]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SinkError> {
        debug!(url, "Connecting to SQLite database");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        info!(url, "Connected to SQLite database");

        let sink = Self { pool };
        sink.ensure_table().await?;
        Ok(sink)
    }

    /// Create the `transactions` table if it does not exist yet
    pub async fn ensure_table(&self) -> Result<(), SinkError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<u64, SinkError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Transaction hashes of a stored batch, in insertion order
    #[cfg(test)]
    pub(crate) async fn batch_hashes(&self, batch_id: i64) -> Result<Vec<String>, SinkError> {
        let hashes: Vec<String> =
            sqlx::query_scalar("SELECT hash FROM transactions WHERE batch_id = ? ORDER BY id")
                .bind(batch_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(hashes)
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite connection pool closed");
    }

    async fn insert_batch(&self, records: &[TransactionRecord]) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let batch_id: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(batch_id), 0) + 1 FROM transactions")
                .fetch_one(&mut *tx)
                .await?;
        let flushed_at = chrono::Utc::now().to_rfc3339();

        for record in records {
            sqlx::query(INSERT_RECORD)
                .bind(batch_id)
                .bind(&flushed_at)
                .bind(record.block_hash())
                .bind(record.block_number())
                .bind(record.hash())
                .bind(record.transaction_index())
                .bind(record.nonce())
                .bind(record.from())
                .bind(record.to())
                .bind(record.value())
                .bind(record.gas())
                .bind(record.gas_price())
                .bind(record.input())
                .bind(record.trace())
                .bind(record.contract_address())
                .bind(record.cumulative_gas_used())
                .bind(record.gas_used())
                .bind(record.status())
                .bind(record.fail_reason())
                .execute(&mut *tx)
                .await?;
        }

        // Dropping `tx` without commit rolls the whole batch back
        tx.commit().await?;
        Ok(batch_id)
    }
}

#[async_trait]
impl BatchSink for SqliteSink {
    async fn write_batch(&self, records: &[TransactionRecord]) -> Result<(), SinkError> {
        if self.pool.is_closed() {
            return Err(SinkError::Unavailable("connection pool is closed".to_string()));
        }

        match self.insert_batch(records).await {
            Ok(batch_id) => {
                debug!(batch_id, count = records.len(), "Batch stored");
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, count = records.len(), "Batch insert rolled back");
                Err(SinkError::Database(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TransactionBatch;

    fn record(hash: &str) -> TransactionRecord {
        TransactionRecord::builder()
            .block_hash("0xb1")
            .block_number("100")
            .hash(hash)
            .transaction_index("0")
            .nonce("1")
            .from("0x01")
            .to("0x02")
            .value("1000")
            .gas("21000")
            .gas_price("1")
            .input("0x")
            .cumulative_gas_used("21000")
            .gas_used("21000")
            .status("1")
            .build()
            .unwrap()
    }

    async fn setup_sink() -> SqliteSink {
        SqliteSink::connect("sqlite::memory:", 1)
            .await
            .expect("Failed to connect to in-memory db")
    }

    #[tokio::test]
    async fn test_write_batch_stores_records_in_order() {
        let sink = setup_sink().await;

        sink.write_batch(&[record("0xa"), record("0xb"), record("0xc")])
            .await
            .unwrap();

        assert_eq!(sink.count().await.unwrap(), 3);
        assert_eq!(sink.batch_hashes(1).await.unwrap(), vec!["0xa", "0xb", "0xc"]);
    }

    #[tokio::test]
    async fn test_batches_are_numbered_sequentially() {
        let sink = setup_sink().await;

        sink.write_batch(&[record("0xa")]).await.unwrap();
        sink.write_batch(&[record("0xb"), record("0xc")]).await.unwrap();

        assert_eq!(sink.batch_hashes(1).await.unwrap(), vec!["0xa"]);
        assert_eq!(sink.batch_hashes(2).await.unwrap(), vec!["0xb", "0xc"]);
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let sink = setup_sink().await;
        sink.write_batch(&[record("0xa")]).await.unwrap();

        sink.ensure_table().await.unwrap();

        assert_eq!(sink.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_batch_for_retry() {
        let sink = setup_sink().await;
        let mut batch = TransactionBatch::new(2).unwrap();
        batch.append(record("0xa")).unwrap();
        batch.append(record("0xb")).unwrap();

        sqlx::query("DROP TABLE transactions")
            .execute(&sink.pool)
            .await
            .unwrap();
        assert!(batch.flush(&sink).await.is_err());
        assert_eq!(batch.len(), 2);

        sink.ensure_table().await.unwrap();
        assert_eq!(batch.flush(&sink).await.unwrap(), 2);
        assert_eq!(sink.batch_hashes(1).await.unwrap(), vec!["0xa", "0xb"]);
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_write_after_close_is_unavailable() {
        let sink = setup_sink().await;
        sink.close().await;

        let err = sink.write_batch(&[record("0xa")]).await.unwrap_err();

        assert!(matches!(err, SinkError::Unavailable(_)));
    }
}
