//! Data Transfer Objects
//!
//! Payloads that leave the runner: responses from a remote artifact store
//! and the JSON run report written by the CLI.

pub mod artifact;
pub mod run;
