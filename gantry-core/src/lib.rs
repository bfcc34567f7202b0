//! Gantry Core
//!
//! Core types and abstractions for the Gantry build service.
//!
//! This crate contains:
//! - Domain types: Core business entities (Build, Job, Pipeline, etc.)
//! - DTOs: Request payloads and query options for the build API

pub mod domain;
pub mod dto;
