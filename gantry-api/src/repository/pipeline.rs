//! Pipeline Repository
//!
//! Handles all database operations related to pipelines.

use async_trait::async_trait;
use gantry_core::domain::pipeline::Pipeline;
use sqlx::PgPool;

use crate::model::{PipelineStore, StoreResult};

/// Pipeline store backed by PostgreSQL
#[derive(Clone)]
pub struct PgPipelineRepository {
    pool: PgPool,
}

impl PgPipelineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineRepository {
    async fn get(&self, id: &str) -> StoreResult<Option<Pipeline>> {
        Ok(find_by_id(&self.pool, id).await?)
    }
}

/// Find a pipeline by ID
pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, scm_url, created_at
        FROM pipelines
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
struct PipelineRow {
    id: String,
    scm_url: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: row.id,
            scm_url: row.scm_url,
            create_time: row.created_at,
        }
    }
}
