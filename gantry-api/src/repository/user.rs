//! User Repository
//!
//! Permission lookups for users against source-control URLs.

use async_trait::async_trait;
use gantry_core::domain::user::Permissions;
use sqlx::PgPool;

use crate::model::{PermissionQuery, StoreResult, UserStore};

/// User store backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn get_permissions(&self, query: &PermissionQuery) -> StoreResult<Permissions> {
        Ok(find_permissions(&self.pool, &query.username, &query.scm_url).await?)
    }
}

/// Permissions of `username` on `scm_url`; no row means no permissions
pub async fn find_permissions(
    pool: &PgPool,
    username: &str,
    scm_url: &str,
) -> Result<Permissions, sqlx::Error> {
    let row = sqlx::query_as::<_, PermissionRow>(
        r#"
        SELECT admin, push, pull
        FROM user_permissions
        WHERE username = $1 AND scm_url = $2
        "#,
    )
    .bind(username)
    .bind(scm_url)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()).unwrap_or_default())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PermissionRow {
    admin: bool,
    push: bool,
    pull: bool,
}

impl From<PermissionRow> for Permissions {
    fn from(row: PermissionRow) -> Self {
        Permissions {
            admin: row.admin,
            push: row.push,
            pull: row.pull,
        }
    }
}
