//! The declarative HSM descriptor.
//!
//! ```yaml
//! type: hsm
//! version: v1
//! library:
//!   filepath: /usr/lib/libCryptoki2_64.so
//!   image: registry.example.com/hsm-client:1.0
//!   auth:
//!     imagePullSecret: regcred
//! envs:
//!   - name: ChrystokiConfigurationPath
//!     value: /hsm
//! mountpaths:
//!   - name: hsmcrypto
//!     secret: hsm-crypto
//!     mountpath: /hsm
//!     paths:
//!       - key: cafile.pem
//!         path: cafile.pem
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HsmError;
use crate::pod::{EnvVar, ResourceRequirements, VolumeSource};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsmDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub library: Library,
    #[serde(rename = "mountpaths")]
    pub mount_paths: Vec<MountSpec>,
    pub envs: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon: Option<Daemon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    #[serde(rename = "filepath")]
    pub file_path: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Auth {
    pub image_pull_secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountSpec {
    pub name: String,
    #[serde(rename = "secret")]
    pub secret_ref: String,
    #[serde(rename = "mountpath")]
    pub mount_path: String,
    #[serde(rename = "usePVC")]
    pub use_pvc: bool,
    #[serde(rename = "subpath", skip_serializing_if = "String::is_empty")]
    pub sub_path: String,
    #[serde(rename = "paths")]
    pub key_path_mappings: Vec<KeyPath>,
    #[serde(rename = "volumeSource", skip_serializing_if = "Option::is_none")]
    pub volume_source: Option<VolumeSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPath {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Daemon {
    pub image: String,
    pub envs: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
    #[serde(rename = "securityContext", skip_serializing_if = "Option::is_none")]
    pub security_overrides: Option<SecurityOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Daemon privileges; unset fields keep the privileged defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_privilege_escalation: Option<bool>,
}

impl HsmDescriptor {
    /// Load a descriptor from a YAML file.
    ///
    /// A missing or malformed file is an error; there is no fallback.
    pub fn from_file(path: &Path) -> Result<Self, HsmError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| HsmError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let descriptor = Self::from_yaml(&yaml)?;
        debug!(path = %path.display(), mounts = descriptor.mount_paths.len(), "HSM descriptor loaded");
        Ok(descriptor)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, HsmError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Report the first missing required field.
    ///
    /// The library image is only needed when the library is copied into the
    /// pod, so proxy deployments pass `require_image = false`.
    pub fn validate(&self, require_image: bool) -> Result<(), HsmError> {
        let missing = |field: &str| Err(HsmError::MissingField(field.to_string()));

        if self.library.file_path.is_empty() {
            return missing("library.filepath");
        }
        if require_image && self.library.image.is_empty() {
            return missing("library.image");
        }

        for (i, mount) in self.mount_paths.iter().enumerate() {
            if mount.name.is_empty() {
                return missing(&format!("mountpaths[{i}].name"));
            }
            if mount.mount_path.is_empty() {
                return missing(&format!("mountpaths[{i}].mountpath"));
            }
            if !mount.use_pvc && mount.volume_source.is_none() && mount.secret_ref.is_empty() {
                return missing(&format!("mountpaths[{i}].secret"));
            }
        }

        if let Some(daemon) = &self.daemon {
            if daemon.image.is_empty() {
                return missing("daemon.image");
            }
        }
        Ok(())
    }

    /// The first mount backed by a caller-provided persistent volume.
    pub fn pvc_mount(&self) -> Option<&MountSpec> {
        self.mount_paths.iter().find(|m| m.use_pvc)
    }
}
