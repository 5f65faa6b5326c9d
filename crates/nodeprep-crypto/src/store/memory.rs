//! In-memory object store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MaterialRecord, ObjectStore, StoreError};

/// Object store kept in process memory.
///
/// Counts upserts and deletes, and can be told to fail writes for given
/// record names.
#[derive(Default)]
pub struct MemoryStore {
    /// Records indexed by (namespace, name).
    records: RwLock<HashMap<(String, String), MaterialRecord>>,

    /// Record names whose writes fail.
    failing: RwLock<HashSet<String>>,

    upserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `name` fail with a backend error.
    pub async fn fail_writes_for(&self, name: impl Into<String>) {
        self.failing.write().await.insert(name.into());
    }

    /// Number of successful upserts.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Number of successful deletes.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Names of all records in a namespace, sorted.
    pub async fn names(&self, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .read()
            .await
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    async fn check_writable(&self, name: &str) -> Result<(), StoreError> {
        if self.failing.read().await.contains(name) {
            return Err(StoreError::Backend(format!("write to '{}' rejected", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<MaterialRecord, StoreError> {
        self.records
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create_or_update(&self, record: MaterialRecord) -> Result<(), StoreError> {
        self.check_writable(&record.name).await?;

        let key = (record.namespace.clone(), record.name.clone());
        self.records.write().await.insert(key, record);
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.check_writable(name).await?;

        let removed = self
            .records
            .write()
            .await
            .remove(&(namespace.to_string(), name.to_string()));

        match removed {
            Some(_) => {
                self.deletes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(name: &str, payload: &[u8]) -> MaterialRecord {
        MaterialRecord {
            name: name.to_string(),
            namespace: "org1".to_string(),
            labels: BTreeMap::new(),
            owner_references: Vec::new(),
            data: BTreeMap::from([("cert.pem".to_string(), payload.to_vec())]),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = MemoryStore::new();
        store.create_or_update(record("a", b"1")).await.unwrap();
        store.create_or_update(record("a", b"2")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.upsert_count(), 2);
        let stored = store.get("org1", "a").await.unwrap();
        assert_eq!(stored.data["cert.pem"], b"2".to_vec());
    }

    #[tokio::test]
    async fn test_missing_record() {
        let store = MemoryStore::new();
        assert!(store.get("org1", "nope").await.unwrap_err().is_not_found());
        assert!(store.delete("org1", "nope").await.unwrap_err().is_not_found());
        assert_eq!(store.delete_count(), 0);
    }

    #[tokio::test]
    async fn test_namespaces_are_separate() {
        let store = MemoryStore::new();
        store.create_or_update(record("a", b"1")).await.unwrap();
        assert!(store.get("org2", "a").await.is_err());
        assert_eq!(store.names("org1").await, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = MemoryStore::new();
        store.fail_writes_for("a").await;
        let err = store.create_or_update(record("a", b"1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(store.is_empty().await);
    }
}
