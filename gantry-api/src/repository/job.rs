//! Job Repository
//!
//! Handles all database operations related to jobs.

use async_trait::async_trait;
use gantry_core::domain::job::Job;
use sqlx::PgPool;

use crate::model::{JobStore, StoreResult};

/// Job store backed by PostgreSQL
#[derive(Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobRepository {
    async fn get(&self, id: &str) -> StoreResult<Option<Job>> {
        Ok(find_by_id(&self.pool, id).await?)
    }
}

/// Find a job by ID
pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, pipeline_id, name
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    pipeline_id: String,
    name: String,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            pipeline_id: row.pipeline_id,
            name: row.name,
        }
    }
}
