//! Tests for the build resource endpoints.

use axum::http::StatusCode;
use gantry_core::domain::build::BuildStatus;
use gantry_core::domain::user::Permissions;
use gantry_core::dto::build::{ListBuilds, Paginate};
use serde_json::{Value, json};

use crate::credentials::{BUILD_SCOPE, generate_profile};
use crate::model::PermissionQuery;
use crate::tests::helpers::TestServer;
use crate::tests::helpers::fixtures::{
    self, API_URI, BUILD_ID, JOB_ID, PIPELINE_ID, SCM_URL, USERNAME,
};

fn push(allowed: bool) -> Permissions {
    Permissions {
        push: allowed,
        ..Permissions::default()
    }
}

/// Job and pipeline resolve; the user's permissions are up to the test
fn server_with_chain(permissions: Permissions) -> TestServer {
    let server = TestServer::new();
    server.jobs.on_get(JOB_ID, Ok(Some(fixtures::job())));
    server
        .pipelines
        .on_get(PIPELINE_ID, Ok(Some(fixtures::pipeline())));
    server
        .users
        .on_get_permissions(USERNAME, SCM_URL, Ok(permissions));
    server
}

// ==================== GET /builds ====================

#[tokio::test]
async fn test_list_returns_all_builds() {
    let server = TestServer::new();
    let builds = fixtures::builds();
    server.builds.on_list(Ok(builds.clone()));

    let response = server.get("/builds?page=1&count=2", None).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>(), serde_json::to_value(&builds).unwrap());
    assert_eq!(
        server.builds.list_calls(),
        vec![ListBuilds {
            paginate: Paginate { page: 1, count: 2 },
        }]
    );
}

#[tokio::test]
async fn test_list_uses_default_page() {
    let server = TestServer::new();
    server.builds.on_list(Ok(vec![]));

    let response = server.get("/builds", None).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!([]));
    assert_eq!(
        server.builds.list_calls(),
        vec![ListBuilds {
            paginate: Paginate { page: 1, count: 50 },
        }]
    );
}

#[tokio::test]
async fn test_list_rejects_oversized_page() {
    let server = TestServer::new();

    let response = server.get("/builds?page=1&count=51", None).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(server.builds.list_calls().is_empty());
}

#[tokio::test]
async fn test_list_returns_500_on_store_error() {
    let server = TestServer::new();
    server.builds.on_list(Err("listError".to_string()));

    let response = server.get("/builds", None).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

// ==================== GET /builds/{id} ====================

#[tokio::test]
async fn test_get_returns_existing_build() {
    let server = TestServer::new();
    let build = fixtures::build(BUILD_ID, BuildStatus::Success);
    server.builds.on_get(BUILD_ID, Ok(Some(build.clone())));

    let response = server.get(&format!("/builds/{}", BUILD_ID), None).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>(), serde_json::to_value(&build).unwrap());
}

#[tokio::test]
async fn test_get_returns_404_for_missing_build() {
    let server = TestServer::new();
    server.builds.on_get(BUILD_ID, Ok(None));

    let response = server.get(&format!("/builds/{}", BUILD_ID), None).await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_get_returns_500_without_leaking_error() {
    let server = TestServer::new();
    server.builds.on_get(BUILD_ID, Err("blah".to_string()));

    let response = server.get(&format!("/builds/{}", BUILD_ID), None).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().contains("blah"));
}

// ==================== PUT /builds/{id} ====================

#[tokio::test]
async fn test_update_returns_updated_build() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);
    let updated = fixtures::build(BUILD_ID, BuildStatus::Success);
    server.builds.on_update(Ok(Some(updated.clone())));

    let response = server
        .send_json(
            "PUT",
            &format!("/builds/{}", BUILD_ID),
            &json!({ "status": "SUCCESS" }),
            Some(&token),
        )
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>(), serde_json::to_value(&updated).unwrap());

    let calls = server.builds.update_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, BUILD_ID);
    assert_eq!(calls[0].1.status, BuildStatus::Success);
}

#[tokio::test]
async fn test_update_returns_404_for_missing_build() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);
    server.builds.on_update(Ok(None));

    let response = server
        .send_json(
            "PUT",
            &format!("/builds/{}", BUILD_ID),
            &json!({ "status": "SUCCESS" }),
            Some(&token),
        )
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_returns_500_on_store_error() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);
    server.builds.on_update(Err("error".to_string()));

    let response = server
        .send_json(
            "PUT",
            &format!("/builds/{}", BUILD_ID),
            &json!({ "status": "SUCCESS" }),
            Some(&token),
        )
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_update_rejects_unknown_status() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);

    let response = server
        .send_json(
            "PUT",
            &format!("/builds/{}", BUILD_ID),
            &json!({ "status": "EXPLODED" }),
            Some(&token),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(server.builds.update_calls().is_empty());
}

#[tokio::test]
async fn test_update_checks_scope_before_payload() {
    let server = TestServer::new();
    let token = server.build_token(BUILD_ID);

    let response = server
        .send_json(
            "PUT",
            &format!("/builds/{}", BUILD_ID),
            &json!({ "status": "EXPLODED" }),
            Some(&token),
        )
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert!(server.builds.update_calls().is_empty());
}

// ==================== POST /builds ====================

#[tokio::test]
async fn test_create_returns_201_with_location() {
    let server = server_with_chain(push(true));
    let token = server.user_token(USERNAME);
    let created = fixtures::build(BUILD_ID, BuildStatus::Queued);
    server.builds.on_create(Ok(created.clone()));

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>(), serde_json::to_value(&created).unwrap());
    assert_eq!(
        response.header("location"),
        Some(format!("http://localhost:12345/builds/{}", BUILD_ID).as_str())
    );

    let calls = server.builds.create_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].job_id, JOB_ID);
    assert_eq!(calls[0].api_uri, API_URI);
    assert_eq!(calls[0].username, USERNAME);
}

#[tokio::test]
async fn test_create_hands_build_scoped_token_generator() {
    let server = server_with_chain(push(true));
    let token = server.user_token(USERNAME);
    server
        .builds
        .on_create(Ok(fixtures::build(BUILD_ID, BuildStatus::Queued)));

    server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await
        .assert_status(StatusCode::CREATED);

    let calls = server.builds.create_calls();
    let build_token = (calls[0].token_gen)("12345").unwrap();
    let profile = server.credentials.verify(&build_token).unwrap();

    assert_eq!(profile, generate_profile("12345", &[BUILD_SCOPE]));
}

#[tokio::test]
async fn test_create_resolves_chain_in_order() {
    let server = server_with_chain(push(true));
    let token = server.user_token(USERNAME);
    server
        .builds
        .on_create(Ok(fixtures::build(BUILD_ID, BuildStatus::Queued)));

    server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    assert_eq!(server.jobs.calls(), vec![JOB_ID.to_string()]);
    assert_eq!(server.pipelines.calls(), vec![PIPELINE_ID.to_string()]);
    assert_eq!(
        server.users.calls(),
        vec![PermissionQuery {
            username: USERNAME.to_string(),
            scm_url: SCM_URL.to_string(),
        }]
    );
}

#[tokio::test]
async fn test_create_returns_500_when_model_fails() {
    let server = server_with_chain(push(true));
    let token = server.user_token(USERNAME);
    server.builds.on_create(Err("datastoreSaveError".to_string()));

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().contains("datastoreSaveError"));
}

#[tokio::test]
async fn test_create_unauthorized_without_push_permission() {
    let server = server_with_chain(push(false));
    let token = server.user_token(USERNAME);

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(server.builds.create_calls().is_empty());
}

#[tokio::test]
async fn test_create_admin_without_push_is_still_unauthorized() {
    let server = server_with_chain(Permissions {
        admin: true,
        push: false,
        pull: true,
    });
    let token = server.user_token(USERNAME);

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(server.builds.create_calls().is_empty());
}

#[tokio::test]
async fn test_create_returns_404_for_missing_job() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(server.pipelines.calls().is_empty());
    assert!(server.users.calls().is_empty());
    assert!(server.builds.create_calls().is_empty());
}

#[tokio::test]
async fn test_create_returns_404_for_missing_pipeline() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);
    server.jobs.on_get(JOB_ID, Ok(Some(fixtures::job())));

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(server.users.calls().is_empty());
    assert!(server.builds.create_calls().is_empty());
}

#[tokio::test]
async fn test_create_returns_500_when_job_lookup_fails() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);
    server.jobs.on_get(JOB_ID, Err("jobError".to_string()));

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(server.pipelines.calls().is_empty());
    assert!(server.builds.create_calls().is_empty());
}

#[tokio::test]
async fn test_create_returns_500_when_pipeline_lookup_fails() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);
    server.jobs.on_get(JOB_ID, Ok(Some(fixtures::job())));
    server
        .pipelines
        .on_get(PIPELINE_ID, Err("pipelineError".to_string()));

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(server.pipelines.calls(), vec![PIPELINE_ID.to_string()]);
    assert!(server.users.calls().is_empty());
    assert!(server.builds.create_calls().is_empty());
}

#[tokio::test]
async fn test_create_returns_500_when_permission_lookup_fails() {
    let server = TestServer::new();
    let token = server.user_token(USERNAME);
    server.jobs.on_get(JOB_ID, Ok(Some(fixtures::job())));
    server
        .pipelines
        .on_get(PIPELINE_ID, Ok(Some(fixtures::pipeline())));
    server
        .users
        .on_get_permissions(USERNAME, SCM_URL, Err("scmDown".to_string()));

    let response = server
        .send_json("POST", "/builds", &json!({ "jobId": JOB_ID }), Some(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(server.builds.create_calls().is_empty());
}
