//! Build API Handlers
//!
//! HTTP endpoints for the build resource.

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{OriginalUri, Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use gantry_core::domain::build::Build;
use gantry_core::domain::log::LogEntry;
use gantry_core::dto::build::{CreateBuild, ListBuilds, MAX_PAGE_COUNT, Paginate, UpdateBuild};
use gantry_core::dto::log::LogBatch;
use serde::Deserialize;

use crate::api::auth::Auth;
use crate::api::error::{ApiError, ApiResult};
use crate::credentials::{BUILD_SCOPE, USER_SCOPE};
use crate::model::StoreResult;
use crate::service::build_service;
use crate::state::AppState;

// =============================================================================
// Build Endpoints
// =============================================================================

/// GET /builds
/// List builds, one page at a time
///
/// Query parameters:
/// - `page` (optional, default 1)
/// - `count` (optional, default and maximum 50)
pub async fn list_builds(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Build>>> {
    let options = query.into_options()?;
    tracing::debug!("Listing builds: {:?}", options.paginate);

    let builds = build_service::list_builds(&state, options).await?;

    Ok(Json(builds))
}

/// GET /builds/{id}
/// Get build details by ID
pub async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Build>> {
    tracing::debug!("Getting build: {}", id);

    let build = build_service::get_build(&state, &id).await?;

    Ok(Json(build))
}

/// POST /builds
/// Start a build of a job. Requires push permission on the job's repository.
pub async fn create_build(
    State(state): State<AppState>,
    auth: Auth,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Result<Json<CreateBuild>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let profile = auth.require_scope(USER_SCOPE)?;
    let req = payload(body)?;
    tracing::info!(
        "Creating build for job: {} (user: {})",
        req.job_id,
        profile.username
    );

    let build = build_service::create_build(&state, &profile.username, req).await?;
    let location = build_location(&state.api_uri, &headers, uri.path(), &build.id);

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(build)))
}

/// PUT /builds/{id}
/// Update a build's status
pub async fn update_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Auth,
    body: Result<Json<UpdateBuild>, JsonRejection>,
) -> ApiResult<Json<Build>> {
    auth.require_scope(USER_SCOPE)?;
    let data = payload(body)?;
    tracing::info!("Updating build: {} to {:?}", id, data.status);

    let build = build_service::update_build(&state, &id, data).await?;

    Ok(Json(build))
}

// =============================================================================
// Log Endpoints
// =============================================================================

/// GET /builds/{id}/logs
/// Stream a build's logs as newline-delimited JSON
pub async fn get_build_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Auth,
) -> ApiResult<Response> {
    auth.require_scope(USER_SCOPE)?;
    tracing::debug!("Streaming logs for build: {}", id);

    let stream = build_service::get_build_logs(&state, &id).await?;
    let body = Body::from_stream(stream.map(|item| item.and_then(encode_line)));

    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response())
}

/// POST /builds/{id}/logs
/// Append log entries. Only the build's own token may write its logs.
pub async fn append_build_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: Auth,
    body: Result<Json<LogBatch>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let profile = auth.require_scope(BUILD_SCOPE)?;
    if profile.username != id {
        return Err(ApiError::Forbidden(format!(
            "Token is not valid for build {}",
            id
        )));
    }
    let batch = payload(body)?;

    tracing::debug!(
        "Adding {} log entries for build: {}",
        batch.entries.len(),
        id
    );

    build_service::append_build_logs(&state, &id, batch.entries).await?;

    Ok(StatusCode::CREATED)
}

// =============================================================================
// Request Types and Helpers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub count: Option<u32>,
}

impl ListQuery {
    fn into_options(self) -> ApiResult<ListBuilds> {
        let defaults = Paginate::default();
        let page = self.page.unwrap_or(defaults.page);
        let count = self.count.unwrap_or(defaults.count);

        if page == 0 {
            return Err(ApiError::BadRequest("page must be at least 1".to_string()));
        }
        if count == 0 || count > MAX_PAGE_COUNT {
            return Err(ApiError::BadRequest(format!(
                "count must be between 1 and {}",
                MAX_PAGE_COUNT
            )));
        }

        Ok(ListBuilds {
            paginate: Paginate { page, count },
        })
    }
}

/// Unwrap a JSON body once the caller has been authorized.
fn payload<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn encode_line(entry: LogEntry) -> StoreResult<Bytes> {
    let mut line = serde_json::to_vec(&entry)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// URL of a new build under the collection the request was made to.
///
/// The host comes from the request; the scheme from the configured API URI.
fn build_location(api_uri: &str, headers: &HeaderMap, collection_path: &str, id: &str) -> String {
    let (scheme, rest) = api_uri.split_once("://").unwrap_or(("http", api_uri));
    let authority = rest.split('/').next().unwrap_or(rest);

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(authority);

    format!(
        "{}://{}{}/{}",
        scheme,
        host,
        collection_path.trim_end_matches('/'),
        id
    )
}
