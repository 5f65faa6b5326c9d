//! Object store backed by a directory of JSON files.
//!
//! Layout: `<root>/<namespace>/<name>.json`. Files are written owner
//! read/write only since they hold private keys.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{MaterialRecord, ObjectStore, StoreError};

/// Directory-backed object store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, namespace: &str, name: &str) -> Result<PathBuf, StoreError> {
        check_component(namespace)?;
        check_component(name)?;
        Ok(self.root.join(namespace).join(format!("{}.json", name)))
    }
}

/// Namespaces and record names must stay a single path segment under the root.
fn check_component(component: &str) -> Result<(), StoreError> {
    let invalid = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidName(component.to_string()));
    }
    Ok(())
}

fn io_error(name: &str, source: std::io::Error) -> StoreError {
    if source.kind() == ErrorKind::NotFound {
        StoreError::NotFound(name.to_string())
    } else {
        StoreError::Io {
            name: name.to_string(),
            source,
        }
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<MaterialRecord, StoreError> {
        let path = self.record_path(namespace, name)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(name, e))?;

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization {
            name: name.to_string(),
            source,
        })
    }

    async fn create_or_update(&self, record: MaterialRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.namespace, &record.name)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| io_error(&record.name, e))?;
        }

        let bytes =
            serde_json::to_vec_pretty(&record).map_err(|source| StoreError::Serialization {
                name: record.name.clone(),
                source,
            })?;

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| io_error(&record.name, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| io_error(&record.name, e))?;
        }

        debug!(path = %path.display(), "Record written");
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let path = self.record_path(namespace, name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_error(name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record() -> MaterialRecord {
        MaterialRecord {
            name: "tls-peer0-keystore".to_string(),
            namespace: "org1".to_string(),
            labels: BTreeMap::from([("app".to_string(), "peer0".to_string())]),
            owner_references: Vec::new(),
            data: BTreeMap::from([("key.pem".to_string(), b"secret".to_vec())]),
        }
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.create_or_update(record()).await.unwrap();
        let path = dir.path().join("org1").join("tls-peer0-keystore.json");
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let back = store.get("org1", "tls-peer0-keystore").await.unwrap();
        assert_eq!(back, record());

        store.delete("org1", "tls-peer0-keystore").await.unwrap();
        assert!(store
            .get("org1", "tls-peer0-keystore")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_names_cannot_leave_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store"));

        let mut escaping = record();
        escaping.name = "../../etc/passwd".to_string();
        let err = store.create_or_update(escaping).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));

        let mut escaping = record();
        escaping.namespace = "..".to_string();
        assert!(matches!(
            store.create_or_update(escaping).await,
            Err(StoreError::InvalidName(_))
        ));

        assert!(matches!(
            store.get("org1", "a/b").await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.delete("org1/..", "tls-peer0-keystore").await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(!dir.path().join("store").exists());
        assert!(!dir.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.delete("org1", "nope").await.unwrap_err().is_not_found());
    }
}
