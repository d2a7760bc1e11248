//! Kiln Core
//!
//! Core types and abstractions for the Kiln build pipeline.
//!
//! This crate contains:
//! - Domain types: triggers, build configuration, dependency set, packaging
//!   directive, artifacts and the run state machine
//! - Errors: the pipeline error taxonomy, one variant family per stage
//! - DTOs: payloads exchanged with a remote artifact store

pub mod domain;
pub mod dto;
pub mod error;

pub use error::{PackagingError, PipelineError};
