//! Kiln Lua Infrastructure
//!
//! Pipeline definitions (`kiln.lua`) are plain Lua files returning a table.
//! This crate provides:
//! - A restricted sandbox to evaluate them in
//! - The parser turning the returned table into a [`BuildConfig`]
//! - The default definition written by `kiln init`

pub mod parser;
pub mod sandbox;
pub mod template;

pub use kiln_core::domain::config::BuildConfig;
pub use parser::{load_build_definition, parse_build_definition};
pub use sandbox::create_sandbox;
pub use template::default_definition;
