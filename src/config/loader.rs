//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::config::schema::ValidatedConfig;
use crate::config::validation::{validate, ValidationErrors};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

/// Source format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
            Some(ext) if ext == "json" => Format::Json,
            Some(ext) if ext == "yaml" || ext == "yml" => Format::Yaml,
            _ => Format::Toml,
        }
    }
}

/// Decode a document into the untyped shape the validator works on.
/// Blank input decodes to `Value::Null`.
pub fn parse_raw(content: &str, format: Format) -> Result<Value, String> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    match format {
        Format::Toml => toml::from_str::<Value>(content).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
    }
}

/// Read a configuration file without validating it.
pub fn load_raw(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_raw(&content, Format::from_path(path)).map_err(|message| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    })
}

/// Load and validate configuration from a TOML, YAML or JSON file.
pub fn load_config(path: &Path) -> Result<ValidatedConfig, ConfigError> {
    let raw = load_raw(path)?;
    let config = validate(&raw)?;

    tracing::debug!(
        path = %path.display(),
        entries = config.entries.len(),
        "Configuration loaded"
    );
    Ok(config)
}
