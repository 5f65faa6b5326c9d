//! Error types for crypto sourcing and material storage.

use thiserror::Error;

use nodeprep_core::{Category, MaterialKind};

use crate::ou::OuError;
use crate::store::StoreError;

/// Errors raised by a single crypto provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to '{url}' failed: {message}")]
    Request { url: String, message: String },

    #[error("CA returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0} not specified")]
    MissingField(&'static str),

    #[error("failed to decode {field}: {source}")]
    Decode {
        field: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{field} is not valid PEM: {message}")]
    InvalidPem { field: String, message: String },

    #[error("failed to generate key or CSR: {0}")]
    Csr(String),

    #[error("enrollment failed: {0}")]
    Enroll(String),

    #[error("failed to parse certificate: {0}")]
    ParseCert(String),
}

/// Errors from the ping -> validate -> fetch sequence.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Ping failed.
    #[error("ca is not reachable: {0}")]
    Unreachable(#[source] ProviderError),

    /// Validate failed.
    #[error("invalid crypto: {0}")]
    Invalid(#[source] ProviderError),

    /// Fetch failed; propagated without a stage tag.
    #[error(transparent)]
    Fetch(ProviderError),

    /// One bundle of a response failed.
    #[error("could not {category} get crypto: {source}")]
    Bundle {
        category: Category,
        #[source]
        source: Box<CryptoError>,
    },
}

impl CryptoError {
    /// Category of the failing bundle, if known.
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Bundle { category, .. } => Some(*category),
            _ => None,
        }
    }
}

/// Errors from persisting or reading material records.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("failed to create/update secret '{name}': {source}")]
    Upsert {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to get secret '{name}': {source}")]
    Get {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete secret '{name}': {source}")]
    Delete {
        name: String,
        #[source]
        source: StoreError,
    },

    /// One of the five creation steps failed.
    #[error("failed to create {kind} secret: {source}")]
    Step {
        kind: MaterialKind,
        #[source]
        source: Box<MaterialError>,
    },

    /// A batch operation failed on one category.
    #[error("failed to {action} {category} secrets: {source}")]
    Category {
        action: &'static str,
        category: Category,
        #[source]
        source: Box<MaterialError>,
    },
}

/// Errors from a full provisioning pass.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Ou(#[from] OuError),

    #[error(transparent)]
    Material(#[from] MaterialError),
}
