//! Repository Module
//!
//! PostgreSQL implementations of the model-layer stores.
//! Each repository handles database operations for a specific domain entity.

pub mod build;
pub mod job;
pub mod log;
pub mod pipeline;
pub mod user;

// Re-export for convenience
pub use log as log_repository;

pub use build::PgBuildRepository;
pub use job::PgJobRepository;
pub use pipeline::PgPipelineRepository;
pub use user::PgUserRepository;
