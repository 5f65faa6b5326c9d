//! Crypto categories and material record naming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Independent material axis of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Node identity.
    Enrollment,
    /// TLS server identity.
    Tls,
    /// Client authentication identity.
    ClientAuth,
}

impl Category {
    /// All categories, in the order every batch operation walks them.
    pub const ALL: [Category; 3] = [Category::Enrollment, Category::Tls, Category::ClientAuth];

    /// Prefix used in material record names.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Enrollment => "ecert",
            Self::Tls => "tls",
            Self::ClientAuth => "clientauth",
        }
    }

    /// Human readable name used in error context.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment",
            Self::Tls => "tls",
            Self::ClientAuth => "clientauth",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ecert" | "enrollment" => Ok(Self::Enrollment),
            "tls" => Ok(Self::Tls),
            "clientauth" => Ok(Self::ClientAuth),
            other => Err(CoreError::UnknownCategory(other.to_string())),
        }
    }
}

/// One of the five material records kept per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    AdminCerts,
    CaCerts,
    IntermediateCerts,
    SignCert,
    Keystore,
}

impl MaterialKind {
    /// All kinds, in creation order.
    pub const ALL: [MaterialKind; 5] = [
        MaterialKind::AdminCerts,
        MaterialKind::CaCerts,
        MaterialKind::IntermediateCerts,
        MaterialKind::SignCert,
        MaterialKind::Keystore,
    ];

    /// Suffix of the record name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::AdminCerts => "admincerts",
            Self::CaCerts => "cacerts",
            Self::IntermediateCerts => "intercerts",
            Self::SignCert => "signcert",
            Self::Keystore => "keystore",
        }
    }

    /// Blob name prefix for list-valued kinds (`<prefix>-<index>.pem`).
    pub fn blob_prefix(&self) -> Option<&'static str> {
        match self {
            Self::AdminCerts => Some("admincert"),
            Self::CaCerts => Some("cacert"),
            Self::IntermediateCerts => Some("intercert"),
            Self::SignCert | Self::Keystore => None,
        }
    }

    /// Fixed blob name for singular kinds.
    pub fn blob_name(&self) -> Option<&'static str> {
        match self {
            Self::SignCert => Some("cert.pem"),
            Self::Keystore => Some("key.pem"),
            _ => None,
        }
    }

    /// Deterministic record name: `<category>-<node>-<kind>`.
    pub fn record_name(&self, category: Category, node_name: &str) -> String {
        format!("{}-{}-{}", category.prefix(), node_name, self.suffix())
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_names() {
        assert_eq!(
            MaterialKind::SignCert.record_name(Category::Enrollment, "peer0"),
            "ecert-peer0-signcert"
        );
        assert_eq!(
            MaterialKind::IntermediateCerts.record_name(Category::Tls, "org1-orderer"),
            "tls-org1-orderer-intercerts"
        );
        assert_eq!(
            MaterialKind::Keystore.record_name(Category::ClientAuth, "peer0"),
            "clientauth-peer0-keystore"
        );
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("ecert".parse::<Category>().unwrap(), Category::Enrollment);
        assert_eq!("TLS".parse::<Category>().unwrap(), Category::Tls);
        assert!("bogus".parse::<Category>().is_err());
    }

    #[test]
    fn test_blob_naming() {
        assert_eq!(MaterialKind::CaCerts.blob_prefix(), Some("cacert"));
        assert_eq!(MaterialKind::Keystore.blob_name(), Some("key.pem"));
        assert_eq!(MaterialKind::AdminCerts.blob_name(), None);
    }
}
