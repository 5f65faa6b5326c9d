//! CLI configuration.

use std::path::PathBuf;

/// Settings shared by every subcommand.
pub struct Config {
    /// Root of the file-backed material store.
    pub store_dir: PathBuf,

    /// Where externalized orderer CA certificates are written.
    pub cert_dir: PathBuf,

    /// Namespace used when none is given.
    pub namespace: String,

    /// Default log filter.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("./nodeprep-store"),
            cert_dir: PathBuf::from("./orderer-certs"),
            namespace: "default".to_string(),
            log_level: "info".to_string(),
        }
    }
}
