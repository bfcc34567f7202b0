//! Test server infrastructure.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use crate::api::create_router;
use crate::credentials::{BUILD_SCOPE, Credentials, USER_SCOPE, generate_profile};
use crate::state::AppState;

use super::fixtures::{API_URI, HOST, JWT_SECRET};
use super::stores::{MockBuildStore, MockJobStore, MockPipelineStore, MockUserStore};

/// The real router wired to recording store doubles.
pub struct TestServer {
    pub builds: Arc<MockBuildStore>,
    pub jobs: Arc<MockJobStore>,
    pub pipelines: Arc<MockPipelineStore>,
    pub users: Arc<MockUserStore>,
    pub credentials: Arc<Credentials>,
    router: Router,
}

impl TestServer {
    pub fn new() -> Self {
        let builds = Arc::new(MockBuildStore::default());
        let jobs = Arc::new(MockJobStore::default());
        let pipelines = Arc::new(MockPipelineStore::default());
        let users = Arc::new(MockUserStore::default());
        let credentials = Arc::new(Credentials::new(JWT_SECRET.as_bytes(), 1));

        let state = AppState {
            builds: builds.clone(),
            jobs: jobs.clone(),
            pipelines: pipelines.clone(),
            users: users.clone(),
            credentials: credentials.clone(),
            api_uri: API_URI.to_string(),
        };

        Self {
            builds,
            jobs,
            pipelines,
            users,
            credentials,
            router: create_router(state),
        }
    }

    /// Token carrying the `user` scope
    pub fn user_token(&self, username: &str) -> String {
        self.credentials
            .generate_token(&generate_profile(username, &[USER_SCOPE]))
            .expect("Failed to sign user token")
    }

    /// Token a build would receive from the token generator
    pub fn build_token(&self, build_id: &str) -> String {
        self.credentials
            .generate_token(&generate_profile(build_id, &[BUILD_SCOPE]))
            .expect("Failed to sign build token")
    }

    /// Makes a request and returns the response with its body unread.
    pub async fn request_raw(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    /// Makes a request to the test server.
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self.request_raw(request).await;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Makes a GET request, optionally authorized.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri).header("Host", HOST);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Makes a request with a JSON body and authorization.
    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: &impl serde::Serialize,
        token: Option<&str>,
    ) -> TestResponse {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Host", HOST)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.request(builder.body(Body::from(body_bytes)).unwrap())
            .await
    }
}

/// Buffered response from the test server.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("Invalid JSON body ({}): {}", e, self.text()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected {}, got {} with body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}
