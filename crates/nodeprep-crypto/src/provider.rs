//! The crypto provider capability set.

use async_trait::async_trait;

use nodeprep_core::CryptoBundle;

use crate::error::ProviderError;

/// A source of crypto material for one category of a node.
///
/// Implementations must not retry internally; the orchestrator calls
/// `ping`, `validate` and `fetch` exactly once each, in that order.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Check that the material source can be reached.
    async fn ping(&self) -> Result<(), ProviderError>;

    /// Check that the request is complete and well formed.
    fn validate(&self) -> Result<(), ProviderError>;

    /// Produce the bundle.
    async fn fetch(&self) -> Result<CryptoBundle, ProviderError>;
}
