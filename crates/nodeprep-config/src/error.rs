//! Error types for loading, merging and writing node configurations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the configuration layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// Both the modern parse and the legacy bootstrap rewrite failed.
    #[error("failed to parse config: {modern}; legacy bootstrap fallback failed: {legacy}")]
    Legacy {
        modern: serde_yaml::Error,
        legacy: serde_yaml::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("failed to decode caCertsFile of address override {index}: {source}")]
    AddressOverride {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("unsupported fabric version '{0}'")]
    UnsupportedVersion(String),
}
