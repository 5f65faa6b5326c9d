//! HSM descriptor and projection errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HsmError {
    #[error("failed to read HSM descriptor '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse HSM descriptor: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("HSM descriptor is missing required field '{0}'")]
    MissingField(String),

    #[error("container '{0}' not found in pod")]
    ContainerNotFound(String),

    #[error("container '{0}' has no command to wait on the HSM daemon")]
    NoCommand(String),
}
