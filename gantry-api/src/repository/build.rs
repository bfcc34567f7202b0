//! Build Repository
//!
//! Handles all database operations related to builds.

use async_trait::async_trait;
use gantry_core::domain::build::{Build, BuildStatus};
use gantry_core::domain::log::LogEntry;
use gantry_core::dto::build::{ListBuilds, UpdateBuild};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::model::{BuildStore, LogStream, NewBuild, StoreError, StoreResult};
use crate::repository::log_repository;

/// Build store backed by PostgreSQL
#[derive(Clone)]
pub struct PgBuildRepository {
    pool: PgPool,
}

impl PgBuildRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BuildStore for PgBuildRepository {
    async fn create(&self, new_build: NewBuild) -> StoreResult<Build> {
        create(&self.pool, new_build).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Build>> {
        Ok(find_by_id(&self.pool, id).await?)
    }

    async fn update(&self, id: &str, data: UpdateBuild) -> StoreResult<Option<Build>> {
        Ok(update_status(&self.pool, id, data.status).await?)
    }

    async fn list(&self, options: ListBuilds) -> StoreResult<Vec<Build>> {
        Ok(list_page(&self.pool, options).await?)
    }

    async fn stream(&self, build_id: &str) -> StoreResult<LogStream> {
        Ok(log_repository::stream_by_build(
            self.pool.clone(),
            build_id.to_string(),
        ))
    }

    async fn append_logs(&self, build_id: &str, entries: Vec<LogEntry>) -> StoreResult<()> {
        Ok(log_repository::add_entries(&self.pool, build_id, entries).await?)
    }
}

/// Create a build and enqueue it for an executor.
///
/// The build number is the creation time in milliseconds. If another build
/// of the same job already holds that number, the next free one is used.
pub async fn create(pool: &PgPool, new_build: NewBuild) -> StoreResult<Build> {
    let now = chrono::Utc::now();
    let mut numbers = candidate_numbers(now.timestamp_millis()).peekable();

    while let Some(number) = numbers.next() {
        let build = Build {
            id: build_id(&new_build.job_id, number),
            job_id: new_build.job_id.clone(),
            number,
            cause: format!("Started by user {}", new_build.username),
            status: BuildStatus::Queued,
            create_time: now,
            start_time: None,
            end_time: None,
        };

        // The executor authenticates as the build itself
        let token = (new_build.token_gen)(&build.id)?;

        match insert(pool, &build, &new_build.api_uri, &token).await {
            Ok(()) => return Ok(build),
            Err(err) if is_unique_violation(&err) && numbers.peek().is_some() => {
                tracing::debug!("Build number {} taken for job {}", number, build.job_id);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(StoreError::Backend(format!(
        "No free build number for job {}",
        new_build.job_id
    )))
}

/// Insert a build and its queue entry in one transaction
async fn insert(
    pool: &PgPool,
    build: &Build,
    api_uri: &str,
    token: &str,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO builds (id, job_id, number, cause, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&build.id)
    .bind(&build.job_id)
    .bind(build.number)
    .bind(&build.cause)
    .bind(build.status.as_str())
    .bind(build.create_time)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO build_queue (build_id, api_uri, token, queued_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&build.id)
    .bind(api_uri)
    .bind(token)
    .bind(build.create_time)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Find a build by ID
pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Build>, sqlx::Error> {
    let row = sqlx::query_as::<_, BuildRow>(
        r#"
        SELECT id, job_id, number, cause, status, created_at, started_at, ended_at
        FROM builds
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List one page of builds, newest first
pub async fn list_page(pool: &PgPool, options: ListBuilds) -> Result<Vec<Build>, sqlx::Error> {
    let paginate = options.paginate;

    let rows = sqlx::query_as::<_, BuildRow>(
        r#"
        SELECT id, job_id, number, cause, status, created_at, started_at, ended_at
        FROM builds
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(i64::from(paginate.count))
    .bind(paginate.offset() as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Move a build to a new status, stamping start and end times.
/// Returns the updated build, or `None` if it does not exist.
pub async fn update_status(
    pool: &PgPool,
    id: &str,
    status: BuildStatus,
) -> Result<Option<Build>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, BuildRow>(
        r#"
        SELECT id, job_id, number, cause, status, created_at, started_at, ended_at
        FROM builds
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(current) = current else {
        return Ok(None);
    };

    let (started_at, ended_at) = stamp_times(
        status,
        current.started_at,
        current.ended_at,
        chrono::Utc::now(),
    );

    let row = sqlx::query_as::<_, BuildRow>(
        r#"
        UPDATE builds
        SET status = $1, started_at = $2, ended_at = $3
        WHERE id = $4
        RETURNING id, job_id, number, cause, status, created_at, started_at, ended_at
        "#,
    )
    .bind(status.as_str())
    .bind(started_at)
    .bind(ended_at)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(row.into()))
}

// =============================================================================
// Helper Functions
// =============================================================================

type Timestamp = chrono::DateTime<chrono::Utc>;

/// Start and end times of a build after it moves to `status` at `now`.
///
/// The first move to `RUNNING` sets the start time; every move to a terminal
/// status sets the end time.
fn stamp_times(
    status: BuildStatus,
    started_at: Option<Timestamp>,
    ended_at: Option<Timestamp>,
    now: Timestamp,
) -> (Option<Timestamp>, Option<Timestamp>) {
    let started_at = match status {
        BuildStatus::Running => started_at.or(Some(now)),
        _ => started_at,
    };
    let ended_at = if status.is_terminal() {
        Some(now)
    } else {
        ended_at
    };

    (started_at, ended_at)
}

const MAX_NUMBER_ATTEMPTS: i64 = 5;

/// Build numbers to try, starting at the creation time
fn candidate_numbers(first: i64) -> impl Iterator<Item = i64> {
    (0..MAX_NUMBER_ATTEMPTS).map(move |offset| first + offset)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Opaque build id derived from the job and build number
fn build_id(job_id: &str, number: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(job_id.as_bytes());
    hasher.update(b":");
    hasher.update(number.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct BuildRow {
    id: String,
    job_id: String,
    number: i64,
    cause: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<BuildRow> for Build {
    fn from(row: BuildRow) -> Self {
        let status = BuildStatus::parse(&row.status).unwrap_or_else(|| {
            tracing::warn!("Build {} has unknown status {}", row.id, row.status);
            BuildStatus::Queued
        });

        Build {
            id: row.id,
            job_id: row.job_id,
            number: row.number,
            cause: row.cause,
            status,
            create_time: row.created_at,
            start_time: row.started_at,
            end_time: row.ended_at,
        }
    }
}
