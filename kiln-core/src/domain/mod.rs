//! Core domain types
//!
//! This module contains the structures shared by the definition parser,
//! the runner (which executes runs) and the CLI (which reports on them).

pub mod artifact;
pub mod config;
pub mod dependency;
pub mod directive;
pub mod log;
pub mod run;
pub mod trigger;
