//! Compiler configuration.
//!
//! A small set of overrides loadable from a TOML file via `--config`.
//! Everything is optional; an absent field keeps the built-in default.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// IR module name; defaults to the identifier in the `program` header.
    pub module_name: Option<String>,
    /// Target triple written into the module; defaults to the host.
    pub target_triple: Option<String>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse compiler config: {}", e))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
        Self::from_toml(&text)
    }
}
