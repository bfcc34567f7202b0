//! Shared application state
//!
//! Built once in `main` and cloned into every request handler.

use std::sync::Arc;

use crate::credentials::Credentials;
use crate::model::{BuildStore, JobStore, PipelineStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub builds: Arc<dyn BuildStore>,
    pub jobs: Arc<dyn JobStore>,
    pub pipelines: Arc<dyn PipelineStore>,
    pub users: Arc<dyn UserStore>,
    pub credentials: Arc<Credentials>,
    /// Public base URI of this API, without a trailing slash
    pub api_uri: String,
}
