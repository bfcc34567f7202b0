//! Log Repository
//!
//! Handles all database operations related to build logs.

use futures::{Stream, StreamExt};
use gantry_core::domain::log::{LogEntry, LogLevel};
use sqlx::PgPool;

use crate::model::{LogStream, StoreError, StoreResult};

/// Add log entries for a build
pub async fn add_entries(
    pool: &PgPool,
    build_id: &str,
    entries: Vec<LogEntry>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO build_logs (build_id, timestamp, level, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(build_id)
        .bind(entry.timestamp)
        .bind(entry.level.as_str())
        .bind(&entry.message)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Stream the log entries of a build in insertion order.
///
/// The stream owns its pool handle; it ends after the first database error.
pub fn stream_by_build(pool: PgPool, build_id: String) -> LogStream {
    let stream = async_stream::stream! {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT timestamp, level, message
            FROM build_logs
            WHERE build_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(&build_id)
        .fetch(&pool)
        .map(|row| row.map(LogEntry::from).map_err(StoreError::from));

        let mut entries = Box::pin(end_after_error(rows));
        while let Some(item) = entries.next().await {
            yield item;
        }
    };

    Box::pin(stream)
}

/// Pass items through up to and including the first error.
fn end_after_error<T, S>(items: S) -> impl Stream<Item = StoreResult<T>>
where
    S: Stream<Item = StoreResult<T>>,
{
    async_stream::stream! {
        futures::pin_mut!(items);
        while let Some(item) = items.next().await {
            let item: StoreResult<T> = item;
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct LogRow {
    timestamp: chrono::DateTime<chrono::Utc>,
    level: String,
    message: String,
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        LogEntry {
            timestamp: row.timestamp,
            level: LogLevel::parse_lossy(&row.level),
            message: row.message,
        }
    }
}
