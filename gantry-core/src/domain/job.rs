//! Job domain types

use serde::{Deserialize, Serialize};

/// A named unit of work belonging to a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub pipeline_id: String,
    pub name: String,
}
