//! Load, merge and write node configurations.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::bccsp::Bccsp;
use crate::delivery::DeliveryClient;
use crate::error::ConfigError;
use crate::io;
use crate::Merge;

/// A versioned node configuration.
pub trait NodeConfig: Merge + Serialize + DeserializeOwned + Sized {
    /// Parse YAML text into this configuration version.
    fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::Parse)
    }

    /// The crypto provider section, if declared.
    fn bccsp_mut(&mut self) -> Option<&mut Bccsp>;

    /// The delivery client section; `None` for nodes without one.
    fn delivery_client(&self) -> Option<&DeliveryClient> {
        None
    }

    fn delivery_client_mut(&mut self) -> Option<&mut DeliveryClient> {
        None
    }

    /// Merge `overrides` onto this configuration in place.
    ///
    /// Set values in `overrides` win. PKCS11 defaults are applied afterwards,
    /// then embedded address-override certificates are externalized.
    /// Merging the same overrides twice leaves the result unchanged.
    fn merge_with(&mut self, overrides: &Self, using_hsm_proxy: bool) -> Result<(), ConfigError> {
        self.merge_from(overrides);

        if let Some(bccsp) = self.bccsp_mut() {
            bccsp.apply_pkcs11_defaults(using_hsm_proxy);
        }
        if let Some(client) = self.delivery_client_mut() {
            client.externalize_address_overrides()?;
        }

        debug!(using_hsm_proxy, "Configuration overrides merged");
        Ok(())
    }

    /// Decoded orderer CA certificates from the last merge, index-aligned
    /// with the address overrides.
    fn address_override_certs(&self) -> &[Vec<u8>] {
        self.delivery_client()
            .map(DeliveryClient::address_override_certs)
            .unwrap_or_default()
    }

    fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml)
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let yaml = io::read_to_string(path)?;
        let config = Self::parse(&yaml)?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }

    /// Write the configuration as YAML with owner-only permissions.
    fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = self.to_yaml()?;
        io::write_private(path, yaml.as_bytes())?;
        info!(path = %path.display(), "Configuration written");
        Ok(())
    }
}

/// Load a baseline and an override file, merge them and write the result.
///
/// Returns the merged configuration so the caller can persist
/// [`NodeConfig::address_override_certs`].
pub fn merge_files<C: NodeConfig>(
    baseline: &Path,
    overrides: &Path,
    output: &Path,
    using_hsm_proxy: bool,
) -> Result<C, ConfigError> {
    let mut config = C::read_from(baseline)?;
    let overrides = C::read_from(overrides)?;
    config.merge_with(&overrides, using_hsm_proxy)?;
    config.write_to(output)?;
    Ok(config)
}
