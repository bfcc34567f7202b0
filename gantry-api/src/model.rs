//! Model Layer
//!
//! Contracts between the HTTP handlers and persistence. Each store is
//! constructed once at startup and shared as a trait object, so handlers
//! never know which backend answers them.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use gantry_core::domain::build::Build;
use gantry_core::domain::job::Job;
use gantry_core::domain::log::LogEntry;
use gantry_core::domain::pipeline::Pipeline;
use gantry_core::domain::user::Permissions;
use gantry_core::dto::build::{ListBuilds, UpdateBuild};
use thiserror::Error;

use crate::credentials::{CredentialsError, TokenGen};

/// Failure inside a store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("token generation failed: {0}")]
    Token(#[from] CredentialsError),
    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Log entries of one build, in the order they were written
pub type LogStream = BoxStream<'static, StoreResult<LogEntry>>;

/// Everything the build store needs to create and enqueue a build
#[derive(Clone)]
pub struct NewBuild {
    pub job_id: String,
    pub api_uri: String,
    pub username: String,
    pub token_gen: TokenGen,
}

impl fmt::Debug for NewBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewBuild")
            .field("job_id", &self.job_id)
            .field("api_uri", &self.api_uri)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Permission lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionQuery {
    pub username: String,
    pub scm_url: String,
}

#[async_trait]
pub trait BuildStore: Send + Sync {
    async fn create(&self, new_build: NewBuild) -> StoreResult<Build>;
    async fn get(&self, id: &str) -> StoreResult<Option<Build>>;
    /// Returns `None` when no build has this id
    async fn update(&self, id: &str, data: UpdateBuild) -> StoreResult<Option<Build>>;
    async fn list(&self, options: ListBuilds) -> StoreResult<Vec<Build>>;
    async fn stream(&self, build_id: &str) -> StoreResult<LogStream>;
    async fn append_logs(&self, build_id: &str, entries: Vec<LogEntry>) -> StoreResult<()>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Job>>;
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Pipeline>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_permissions(&self, query: &PermissionQuery) -> StoreResult<Permissions>;
}
