//! Durable fingerprint index.
//!
//! One table keyed by object name, written once per object ever observed.
//! Every operation runs its SQL inside a transaction wrapped in
//! [`with_tx_retry`], which re-executes the body on the retryable conflict
//! class (SQLite busy/locked, serialization failure on a server-backed pool)
//! and surfaces anything persistent as [`IndexError::Unavailable`].

use crate::models::record::ObjectRecord;
use sqlx::SqlitePool;
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("fingerprint index unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Transaction attempts before a conflict is treated as persistent.
const MAX_TX_RETRIES: u32 = 5;

/// Metadata inventory of every object the pipeline has seen.
///
/// Insert-only: conflict on the `name` primary key is swallowed as success,
/// so re-processing an object is always safe. The fingerprint count a caller
/// observes before its own insert classifies the object as new or duplicate.
#[derive(Clone)]
pub struct FingerprintIndex {
    /// Shared connection pool used for all index operations.
    pub db: Arc<SqlitePool>,
}

impl FingerprintIndex {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create the backing table and fingerprint index if absent.
    ///
    /// Idempotent; safe to run at every process start. Failure here means no
    /// processing can proceed.
    pub async fn ensure_schema(&self) -> IndexResult<()> {
        with_tx_retry("ensure_schema", || async move {
            let mut tx = self.db.begin().await?;
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS images (
                     name TEXT PRIMARY KEY,
                     section TEXT NOT NULL,
                     prefix TEXT NOT NULL,
                     size INTEGER NOT NULL,
                     fingerprint INTEGER NOT NULL
                 )",
            )
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "CREATE INDEX IF NOT EXISTS images_fingerprint_idx ON images (fingerprint)",
            )
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Number of recorded objects sharing `fingerprint`.
    pub async fn count_by_fingerprint(&self, fingerprint: u32) -> IndexResult<i64> {
        with_tx_retry("count_by_fingerprint", || async move {
            let mut tx = self.db.begin().await?;
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE fingerprint = ?")
                    .bind(fingerprint)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.commit().await?;
            Ok(count)
        })
        .await
    }

    /// Insert a record; conflict on `name` means the object is already
    /// recorded and is success.
    pub async fn insert(&self, record: &ObjectRecord) -> IndexResult<()> {
        with_tx_retry("insert", || async move {
            let mut tx = self.db.begin().await?;
            sqlx::query(
                "INSERT INTO images (name, section, prefix, size, fingerprint)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(&record.name)
            .bind(&record.section)
            .bind(&record.prefix)
            .bind(record.size)
            .bind(record.fingerprint)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }
}

/// Re-execute a transaction body until it commits or fails persistently.
///
/// Retries only the conflict class with exponential backoff; any other
/// database error aborts immediately.
async fn with_tx_retry<T, F, Fut>(op: &str, body: F) -> IndexResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    for attempt in 0..=MAX_TX_RETRIES {
        match body().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_TX_RETRIES && is_retryable_conflict(&err) => {
                let delay = Duration::from_millis(20u64 << attempt);
                tracing::warn!(
                    op,
                    attempt = attempt + 1,
                    error = %err,
                    "transaction conflict, retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(IndexError::Unavailable(err)),
        }
    }

    unreachable!("transaction retry loop exited without returning")
}

/// Return true for the error class worth re-executing the transaction on.
fn is_retryable_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            // 40001 is serialization_failure on server-backed databases.
            if db_err.code().as_deref() == Some("40001") {
                return true;
            }
            let message = db_err.message().to_ascii_lowercase();
            message.contains("database is locked") || message.contains("database table is locked")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_index() -> FingerprintIndex {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        let index = FingerprintIndex::new(Arc::new(pool));
        index.ensure_schema().await.expect("schema");
        index
    }

    fn record(name: &str, fingerprint: u32) -> ObjectRecord {
        ObjectRecord {
            name: name.to_string(),
            section: "A".to_string(),
            prefix: "A/1".to_string(),
            size: 3,
            fingerprint,
        }
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let index = test_index().await;
        index.ensure_schema().await.expect("second run succeeds");
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_no_op() {
        let index = test_index().await;
        index.insert(&record("A/1/1_1.jpg", 111)).await.expect("first insert");
        index.insert(&record("A/1/1_1.jpg", 111)).await.expect("second insert");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(&*index.db)
            .await
            .expect("row count");
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn counts_records_sharing_a_fingerprint() {
        let index = test_index().await;
        assert_eq!(index.count_by_fingerprint(222).await.expect("count"), 0);

        index.insert(&record("A/1/1_2.jpg", 222)).await.expect("insert");
        index.insert(&record("A/2/2_1.jpg", 222)).await.expect("insert");
        index.insert(&record("A/1/1_1.jpg", 111)).await.expect("insert");

        assert_eq!(index.count_by_fingerprint(222).await.expect("count"), 2);
        assert_eq!(index.count_by_fingerprint(111).await.expect("count"), 1);
        assert_eq!(index.count_by_fingerprint(999).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn closed_pool_reports_unavailable() {
        let index = test_index().await;
        index.db.close().await;

        let err = index.count_by_fingerprint(1).await.unwrap_err();
        assert!(matches!(err, IndexError::Unavailable(_)));
    }
}
