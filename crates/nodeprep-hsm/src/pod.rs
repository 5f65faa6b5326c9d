//! The subset of pod specification types the projection produces.
//!
//! Field names serialize the way the cluster API spells them, so a projected
//! [`PodSpec`] can be handed to whatever applies the deployment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

impl PodSpec {
    pub fn container_mut(&mut self, name: &str) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.name == name)
    }

    /// Add a pull secret unless it is empty or already present.
    pub fn add_pull_secret(&mut self, secret: LocalObjectReference) {
        if !secret.name.is_empty() && !self.image_pull_secrets.contains(&secret) {
            self.image_pull_secrets.push(secret);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set an environment variable, replacing an existing one of that name.
    pub fn set_env(&mut self, var: EnvVar) {
        match self.env.iter_mut().find(|e| e.name == var.name) {
            Some(existing) => *existing = var,
            None => self.env.push(var),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sub_path: String,
}

impl VolumeMount {
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mount_path: mount_path.into(),
            sub_path: String::new(),
        }
    }

    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = sub_path.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    Secret(SecretVolumeSource),
    EmptyDir(EmptyDirVolumeSource),
    PersistentVolumeClaim(PvcVolumeSource),
    HostPath(HostPathVolumeSource),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretVolumeSource {
    pub secret_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<KeyToPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyToPath {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmptyDirVolumeSource {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub medium: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PvcVolumeSource {
    pub claim_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostPathVolumeSource {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_privilege_escalation: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRequirements {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalObjectReference {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_yaml_shape() {
        let volume = Volume {
            name: "hsmcrypto".to_string(),
            source: VolumeSource::Secret(SecretVolumeSource {
                secret_name: "hsm-secret".to_string(),
                items: vec![KeyToPath {
                    key: "cafile.pem".to_string(),
                    path: "cafile.pem".to_string(),
                }],
            }),
        };
        let yaml = serde_yaml::to_string(&volume).unwrap();
        assert!(yaml.contains("secretName: hsm-secret"));

        let back: Volume = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, volume);

        let empty: Volume = serde_yaml::from_str("name: shared\nemptyDir:\n  medium: Memory\n").unwrap();
        assert_eq!(
            empty.source,
            VolumeSource::EmptyDir(EmptyDirVolumeSource {
                medium: "Memory".to_string()
            })
        );
    }

    #[test]
    fn test_set_env_replaces() {
        let mut container = Container::new("peer", "fabric-peer");
        container.set_env(EnvVar::new("A", "1"));
        container.set_env(EnvVar::new("B", "2"));
        container.set_env(EnvVar::new("A", "3"));
        assert_eq!(
            container.env,
            vec![EnvVar::new("A", "3"), EnvVar::new("B", "2")]
        );
    }

    #[test]
    fn test_pull_secret_dedup() {
        let mut pod = PodSpec::default();
        pod.add_pull_secret(LocalObjectReference::default());
        pod.add_pull_secret(LocalObjectReference {
            name: "regcred".to_string(),
        });
        pod.add_pull_secret(LocalObjectReference {
            name: "regcred".to_string(),
        });
        assert_eq!(pod.image_pull_secrets.len(), 1);
    }
}
