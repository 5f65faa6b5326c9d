//! Provider for pre-issued MSP material.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use nodeprep_core::CryptoBundle;

use crate::error::ProviderError;
use crate::provider::CryptoProvider;

/// Already-issued material, every entry a base64 encoded PEM document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MspSpec {
    #[serde(default)]
    pub keystore: String,

    #[serde(default)]
    pub signcerts: String,

    #[serde(default)]
    pub cacerts: Vec<String>,

    #[serde(default)]
    pub intermediatecerts: Vec<String>,

    #[serde(default)]
    pub admincerts: Vec<String>,
}

/// Parses material supplied up front. Never touches the network.
#[derive(Debug, Clone)]
pub struct MspProvider {
    spec: MspSpec,
}

impl MspProvider {
    /// Create a new MspProvider.
    pub fn new(spec: MspSpec) -> Self {
        Self { spec }
    }

    /// Get the spec this provider serves.
    pub fn spec(&self) -> &MspSpec {
        &self.spec
    }
}

/// Decode a base64 PEM entry and check that it holds a PEM block.
fn decode_pem(field: &str, value: &str) -> Result<Vec<u8>, ProviderError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|source| ProviderError::Decode {
            field: field.to_string(),
            source,
        })?;

    ::pem::parse(&bytes).map_err(|e| ProviderError::InvalidPem {
        field: field.to_string(),
        message: e.to_string(),
    })?;

    Ok(bytes)
}

fn decode_list(field: &str, values: &[String]) -> Result<Vec<Vec<u8>>, ProviderError> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| decode_pem(&format!("{}[{}]", field, i), value))
        .collect()
}

#[async_trait]
impl CryptoProvider for MspProvider {
    async fn ping(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if self.spec.keystore.is_empty() {
            return Err(ProviderError::MissingField("keystore"));
        }
        if self.spec.signcerts.is_empty() {
            return Err(ProviderError::MissingField("signcerts"));
        }
        if self.spec.cacerts.is_empty() {
            return Err(ProviderError::MissingField("cacerts"));
        }

        decode_pem("keystore", &self.spec.keystore)?;
        decode_pem("signcerts", &self.spec.signcerts)?;
        decode_list("cacerts", &self.spec.cacerts)?;
        decode_list("intermediatecerts", &self.spec.intermediatecerts)?;
        decode_list("admincerts", &self.spec.admincerts)?;
        Ok(())
    }

    async fn fetch(&self) -> Result<CryptoBundle, ProviderError> {
        Ok(CryptoBundle {
            ca_certs: decode_list("cacerts", &self.spec.cacerts)?,
            intermediate_certs: decode_list("intermediatecerts", &self.spec.intermediatecerts)?,
            admin_certs: decode_list("admincerts", &self.spec.admincerts)?,
            sign_cert: decode_pem("signcerts", &self.spec.signcerts)?,
            private_key: decode_pem("keystore", &self.spec.keystore)?,
        })
    }
}
