//! Core domain types
//!
//! This module contains the core domain structures used across Gantry services.
//! These types represent the fundamental business entities and are shared between
//! the API server (for persistence) and its clients and tests.

pub mod build;
pub mod job;
pub mod log;
pub mod pipeline;
pub mod user;
