//! End-to-end crypto provisioning for one node.

use tracing::info;

use nodeprep_core::{CryptoBundleSet, NodeRef, NodeRole};

use crate::error::ProvisionError;
use crate::material::MaterialStore;
use crate::orchestrator::CryptoOrchestrator;
use crate::ou::verify_response_ou;
use crate::store::ObjectStore;

/// Obtains, validates and persists a node's crypto material.
pub struct Provisioner<S> {
    store: MaterialStore<S>,
}

impl<S: ObjectStore> Provisioner<S> {
    /// Create a new Provisioner.
    pub fn new(store: MaterialStore<S>) -> Self {
        Self { store }
    }

    /// Get the material store.
    pub fn store(&self) -> &MaterialStore<S> {
        &self.store
    }

    /// First-time provisioning: fetch, verify the identity OU, store all.
    pub async fn provision(
        &self,
        node: &NodeRef,
        role: NodeRole,
        orchestrator: &CryptoOrchestrator,
    ) -> Result<CryptoBundleSet, ProvisionError> {
        let response = self.fetch_verified(node, role, orchestrator).await?;
        self.store
            .generate_secrets_from_response(node, &response)
            .await?;
        info!(node = %node.name, namespace = %node.namespace, "Crypto provisioned");
        Ok(response)
    }

    /// Rotation: like [`Provisioner::provision`] but leaves admin certs alone.
    pub async fn rotate(
        &self,
        node: &NodeRef,
        role: NodeRole,
        orchestrator: &CryptoOrchestrator,
    ) -> Result<CryptoBundleSet, ProvisionError> {
        let response = self.fetch_verified(node, role, orchestrator).await?;
        self.store
            .update_secrets_from_response(node, &response)
            .await?;
        info!(node = %node.name, namespace = %node.namespace, "Crypto rotated");
        Ok(response)
    }

    async fn fetch_verified(
        &self,
        node: &NodeRef,
        role: NodeRole,
        orchestrator: &CryptoOrchestrator,
    ) -> Result<CryptoBundleSet, ProvisionError> {
        let response = orchestrator.generate_crypto_response().await?;
        verify_response_ou(&response, role.ou())?;
        info!(node = %node.name, role = %role, "Crypto response verified");
        Ok(response)
    }
}
