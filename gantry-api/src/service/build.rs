//! Build Service
//!
//! Business logic for build creation, lookup and logs.

use gantry_core::domain::build::Build;
use gantry_core::domain::log::LogEntry;
use gantry_core::dto::build::{CreateBuild, ListBuilds, UpdateBuild};

use crate::credentials::BUILD_SCOPE;
use crate::model::{LogStream, NewBuild, PermissionQuery, StoreError};
use crate::state::AppState;

/// Service error type
#[derive(Debug)]
pub enum BuildError {
    NotFound(String),
    JobNotFound(String),
    PipelineNotFound(String),
    Unauthorized { username: String, scm_url: String },
    ValidationError(String),
    Store(StoreError),
}

impl From<StoreError> for BuildError {
    fn from(err: StoreError) -> Self {
        BuildError::Store(err)
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// List one page of builds
pub async fn list_builds(state: &AppState, options: ListBuilds) -> Result<Vec<Build>> {
    let builds = state.builds.list(options).await?;
    Ok(builds)
}

/// Get a build by ID
pub async fn get_build(state: &AppState, id: &str) -> Result<Build> {
    let build = state
        .builds
        .get(id)
        .await?
        .ok_or_else(|| BuildError::NotFound(id.to_string()))?;

    Ok(build)
}

/// Open the log stream of an existing build
pub async fn get_build_logs(state: &AppState, id: &str) -> Result<LogStream> {
    // The stream is only requested for builds that exist
    get_build(state, id).await?;

    let stream = state.builds.stream(id).await?;
    Ok(stream)
}

/// Create a build for a job on behalf of `username`.
///
/// Resolves job, then pipeline, then the user's permissions on the
/// pipeline's repository; each step must succeed before the next runs.
pub async fn create_build(state: &AppState, username: &str, req: CreateBuild) -> Result<Build> {
    let job = state
        .jobs
        .get(&req.job_id)
        .await?
        .ok_or_else(|| BuildError::JobNotFound(req.job_id.clone()))?;

    let pipeline = state
        .pipelines
        .get(&job.pipeline_id)
        .await?
        .ok_or_else(|| BuildError::PipelineNotFound(job.pipeline_id.clone()))?;

    let permissions = state
        .users
        .get_permissions(&PermissionQuery {
            username: username.to_string(),
            scm_url: pipeline.scm_url.clone(),
        })
        .await?;

    if !permissions.push {
        return Err(BuildError::Unauthorized {
            username: username.to_string(),
            scm_url: pipeline.scm_url,
        });
    }

    let build = state
        .builds
        .create(NewBuild {
            job_id: req.job_id,
            api_uri: state.api_uri.clone(),
            username: username.to_string(),
            token_gen: state.credentials.token_generator(&[BUILD_SCOPE]),
        })
        .await?;

    tracing::info!("Build created: {} for job: {}", build.id, build.job_id);

    Ok(build)
}

/// Apply a partial update to a build
pub async fn update_build(state: &AppState, id: &str, data: UpdateBuild) -> Result<Build> {
    let status = data.status;

    let build = state
        .builds
        .update(id, data)
        .await?
        .ok_or_else(|| BuildError::NotFound(id.to_string()))?;

    tracing::info!("Build {} updated to status: {:?}", id, status);

    Ok(build)
}

/// Append a batch of log entries to an existing build
pub async fn append_build_logs(state: &AppState, id: &str, entries: Vec<LogEntry>) -> Result<()> {
    validate_log_entries(&entries)?;

    get_build(state, id).await?;

    if entries.is_empty() {
        return Ok(());
    }

    let count = entries.len();
    state.builds.append_logs(id, entries).await?;

    tracing::debug!("Added {} log entries for build: {}", count, id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_log_entries(entries: &[LogEntry]) -> Result<()> {
    const MAX_MESSAGE_LENGTH: usize = 10_000;
    const MAX_BATCH_SIZE: usize = 1000;

    if entries.len() > MAX_BATCH_SIZE {
        return Err(BuildError::ValidationError(format!(
            "Too many log entries in batch (max: {})",
            MAX_BATCH_SIZE
        )));
    }

    for (i, entry) in entries.iter().enumerate() {
        if entry.message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(BuildError::ValidationError(format!(
                "Log entry {} message too long (max: {} chars)",
                i, MAX_MESSAGE_LENGTH
            )));
        }
    }

    Ok(())
}
