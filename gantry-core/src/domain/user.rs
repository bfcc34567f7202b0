//! User permission types

use serde::{Deserialize, Serialize};

/// What a user may do against a source-control repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub admin: bool,
    pub push: bool,
    pub pull: bool,
}
