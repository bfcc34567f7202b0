//! Log DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::LogEntry;

/// Log batch sent by an executor for one build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogBatch {
    pub entries: Vec<LogEntry>,
}
