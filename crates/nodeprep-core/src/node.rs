//! Node identity passed to every provisioning call.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Role of a node, used as the expected OU of its identity certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Peer,
    Orderer,
    Client,
    Admin,
}

impl NodeRole {
    /// OU value expected in the node's signing certificate.
    pub fn ou(&self) -> &'static str {
        match self {
            Self::Peer => "peer",
            Self::Orderer => "orderer",
            Self::Client => "client",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ou())
    }
}

impl FromStr for NodeRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "peer" => Ok(Self::Peer),
            "orderer" => Ok(Self::Orderer),
            "client" => Ok(Self::Client),
            "admin" => Ok(Self::Admin),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

/// Ownership link stamped on every material record so the records are
/// garbage-collected together with the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// The node a provisioning call acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node name, used in record names.
    pub name: String,

    /// Namespace the node and its records live in.
    pub namespace: String,

    /// Unique id of the owning resource.
    pub uid: String,

    /// Kind of the owning resource (e.g. "Peer").
    pub kind: String,

    /// API version of the owning resource.
    pub api_version: String,

    /// Labels copied onto every record.
    pub labels: BTreeMap<String, String>,
}

impl NodeRef {
    /// Create a new NodeRef.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: String::new(),
            kind: "Node".to_string(),
            api_version: "nodeprep.io/v1".to_string(),
            labels: BTreeMap::new(),
        }
    }

    /// Builder method to set the owner identity.
    pub fn with_owner(
        mut self,
        api_version: impl Into<String>,
        kind: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        self.api_version = api_version.into();
        self.kind = kind.into();
        self.uid = uid.into();
        self
    }

    /// Builder method to add a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Owner reference for records belonging to this node.
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            uid: self.uid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_reference() {
        let node = NodeRef::new("peer0", "org1")
            .with_owner("ibp.com/v1beta1", "IBPPeer", "1234")
            .with_label("app", "peer0");

        let owner = node.owner_reference();
        assert_eq!(owner.name, "peer0");
        assert_eq!(owner.kind, "IBPPeer");
        assert_eq!(owner.uid, "1234");
        assert_eq!(node.labels.get("app").map(String::as_str), Some("peer0"));

        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["apiVersion"], "ibp.com/v1beta1");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Peer".parse::<NodeRole>().unwrap(), NodeRole::Peer);
        assert_eq!(NodeRole::Orderer.ou(), "orderer");
        assert!("ca".parse::<NodeRole>().is_err());
    }
}
