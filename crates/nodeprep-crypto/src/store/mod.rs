//! Namespaced object store holding material records.

mod file;
mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nodeprep_core::OwnerReference;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors returned by an object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist. Read and delete paths treat this as "absent".
    #[error("record '{0}' not found")]
    NotFound(String),

    #[error("I/O error on record '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record '{name}': {source}")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("invalid record path component '{0}'")]
    InvalidName(String),
}

impl StoreError {
    /// Returns true for the "record does not exist" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A named blob map persisted in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecord {
    pub name: String,

    pub namespace: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,

    /// Blob name to raw bytes; base64 encoded on the wire.
    #[serde(with = "base64_data")]
    pub data: BTreeMap<String, Vec<u8>>,
}

/// Object store collaborator.
///
/// `create_or_update` must be an idempotent upsert keyed by
/// `(namespace, name)`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a record, or [`StoreError::NotFound`].
    async fn get(&self, namespace: &str, name: &str) -> Result<MaterialRecord, StoreError>;

    /// Create the record or replace an existing one with the same name.
    async fn create_or_update(&self, record: MaterialRecord) -> Result<(), StoreError>;

    /// Delete a record, or [`StoreError::NotFound`].
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn get(&self, namespace: &str, name: &str) -> Result<MaterialRecord, StoreError> {
        (**self).get(namespace, name).await
    }

    async fn create_or_update(&self, record: MaterialRecord) -> Result<(), StoreError> {
        (**self).create_or_update(record).await
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        (**self).delete(namespace, name).await
    }
}

mod base64_data {
    use std::collections::BTreeMap;

    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        data: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(data.iter().map(|(k, v)| (k, STANDARD.encode(v))))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v.as_bytes())
                    .map(|bytes| (k, bytes))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_data_is_base64_on_the_wire() {
        let record = MaterialRecord {
            name: "ecert-peer0-signcert".to_string(),
            namespace: "org1".to_string(),
            labels: BTreeMap::new(),
            owner_references: Vec::new(),
            data: BTreeMap::from([("cert.pem".to_string(), b"hello".to_vec())]),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["data"]["cert.pem"], "aGVsbG8=");

        let back: MaterialRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
