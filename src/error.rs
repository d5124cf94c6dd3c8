use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Empty configuration payload")]
    EmptyPayload,

    #[error("Failed to parse configuration (line {line}): {reason}")]
    ParseError { line: usize, reason: String },

    #[error("Invalid configuration: missing top-level 'tssc' mapping")]
    MissingRootKey,

    #[error("Failed to decode the 'tssc' section: {0}")]
    DecodeError(#[source] serde_yaml::Error),

    #[error("Invalid configuration: missing namespace")]
    MissingNamespace,

    #[error("Invalid configuration: missing settings")]
    MissingSettings,

    #[error("Invalid product '{name}': {reason}")]
    InvalidProduct { name: String, reason: String },

    #[error("Product '{0}' not found")]
    ProductNotFound(String),

    #[error("Invalid key path '{path}': {reason}")]
    InvalidKeyPath { path: String, reason: &'static str },

    #[error("Path '{path}' not found in configuration: '{segment}' is not an existing mapping")]
    PathNotFound { path: String, segment: String },

    #[error("No key '{key}' found in configuration (path '{path}')")]
    KeyNotFound { key: String, path: String },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Key paths and values do not match: {paths} path(s), {values} value(s)")]
    ArityMismatch { paths: usize, values: usize },

    #[error("No --set patterns provided")]
    NoOverrides,

    #[error("Invalid --set format: {0} (expected key=value)")]
    InvalidSetFormat(String),

    #[error("Invalid product key format: {0} (expected Product[Name].property)")]
    InvalidProductKeyFormat(String),

    #[error("No product name found in brackets in '{0}'")]
    MissingProductName(String),

    #[error("Conflict at key '{0}': intermediate value is not a mapping")]
    PathConflict(String),

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn from_yaml(err: &serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            line: err.location().map(|l| l.line()).unwrap_or(0),
            reason: err.to_string(),
        }
    }
}
