//! Configuration module
//!
//! Resolves the build definition the commands operate on.

use anyhow::Result;
use kiln_core::domain::config::BuildConfig;
use std::path::{Path, PathBuf};
use tracing::info;

/// Definition looked up in the working directory when none is given
pub const DEFAULT_DEFINITION: &str = "kiln.lua";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit build definition path
    pub definition: Option<PathBuf>,
}

impl Config {
    /// Loads the build configuration
    ///
    /// An explicit definition must exist. Without one, `./kiln.lua` is used
    /// when present and the built-in defaults otherwise.
    pub fn load_build_config(&self) -> Result<BuildConfig> {
        match &self.definition {
            Some(path) => kiln_lua::load_build_definition(path),
            None => {
                let path = Path::new(DEFAULT_DEFINITION);
                if path.is_file() {
                    kiln_lua::load_build_definition(path)
                } else {
                    info!("No {} found, using built-in defaults", DEFAULT_DEFINITION);
                    Ok(BuildConfig::default())
                }
            }
        }
    }
}
