//! # Session Configuration
//!
//! Every setting has a default, so an empty JSON object is a valid config.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the metadata and storage endpoints
    pub base_url: String,

    /// Path of the generated file inside the export archive
    pub entry_path: String,

    /// Indentation used for nested generated code
    pub indent: String,

    /// Fail generation on unregistered block types instead of skipping them
    pub strict_block_types: bool,

    /// Store key holding the comma-joined package list
    pub package_list_key: String,

    pub function_colour_base: u16,
    pub struct_colour_base: u16,
    /// Hue added per package position
    pub colour_step: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            entry_path: "cmd/main.go".to_string(),
            indent: "\t".to_string(),
            strict_block_types: true,
            package_list_key: "pkgs".to_string(),
            function_colour_base: 50,
            struct_colour_base: 250,
            colour_step: 30,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::info!("[GOBLOCKS] Loaded configuration from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    /// Hue for the function category of the package at `index`
    pub fn function_colour(&self, index: usize) -> u16 {
        hue(self.function_colour_base, self.colour_step, index)
    }

    pub fn struct_colour(&self, index: usize) -> u16 {
        hue(self.struct_colour_base, self.colour_step, index)
    }
}

fn hue(base: u16, step: u16, index: usize) -> u16 {
    let offset = (step as usize).saturating_mul(index);
    ((base as usize + offset) % 360) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SessionConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.entry_path, "cmd/main.go");
    }

    #[test]
    fn test_partial_override() {
        let config = SessionConfig::from_json_str(r#"{"indent": "    ", "strict_block_types": false}"#).unwrap();
        assert_eq!(config.indent, "    ");
        assert!(!config.strict_block_types);
        assert_eq!(config.package_list_key, "pkgs");
    }

    #[test]
    fn test_category_colours() {
        let config = SessionConfig::default();
        assert_eq!(config.function_colour(0), 50);
        assert_eq!(config.function_colour(2), 110);
        assert_eq!(config.struct_colour(4), 10);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goblocks.json");
        std::fs::write(&path, r#"{"base_url": "http://localhost:8000"}"#).unwrap();
        let config = SessionConfig::from_file(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
    }
}
