//! Pipeline domain types

use serde::{Deserialize, Serialize};

/// Pipeline definition
///
/// A pipeline is tied to a source-control URL; permissions to start its
/// builds are checked against that URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    pub scm_url: String,
    pub create_time: chrono::DateTime<chrono::Utc>,
}
