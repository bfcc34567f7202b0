//! Build DTOs

use serde::{Deserialize, Serialize};

use crate::domain::build::BuildStatus;

/// Largest page a list request may ask for
pub const MAX_PAGE_COUNT: u32 = 50;

/// Request to start a new build of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBuild {
    pub job_id: String,
}

/// Partial update of an existing build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBuild {
    pub status: BuildStatus,
}

/// Page selection for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginate {
    pub page: u32,
    pub count: u32,
}

impl Paginate {
    /// Number of records to skip before this page starts
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.count)
    }
}

impl Default for Paginate {
    fn default() -> Self {
        Self {
            page: 1,
            count: MAX_PAGE_COUNT,
        }
    }
}

/// Options passed to the build store's list operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBuilds {
    pub paginate: Paginate,
}
