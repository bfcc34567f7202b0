//! Data Transfer Objects for the build API
//!
//! This module contains the request payloads and query options exchanged
//! with the Gantry API server.

pub mod build;
pub mod log;
