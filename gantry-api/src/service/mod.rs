//! Service Module
//!
//! Business logic layer for the API server.
//! Services orchestrate between the model-layer stores and contain domain logic.

pub mod build;

// Re-export for convenience
pub use build as build_service;
