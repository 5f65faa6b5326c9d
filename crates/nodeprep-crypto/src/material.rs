//! Persisting crypto bundles as named material records.
//!
//! Every category of a node is stored as five records named
//! `<category>-<node>-<kind>`:
//!
//! | kind         | blobs                        |
//! |--------------|------------------------------|
//! | `admincerts` | `admincert-<i>.pem`          |
//! | `cacerts`    | `cacert-<i>.pem`             |
//! | `intercerts` | `intercert-<i>.pem`          |
//! | `signcert`   | `cert.pem`                   |
//! | `keystore`   | `key.pem`                    |

use std::collections::BTreeMap;

use tracing::{debug, info, info_span, Instrument, Span};

use nodeprep_core::{Category, CryptoBundle, CryptoBundleSet, MaterialKind, NodeRef};

use crate::error::MaterialError;
use crate::store::{MaterialRecord, ObjectStore};

/// Reads and writes a node's crypto bundles through an [`ObjectStore`].
pub struct MaterialStore<S> {
    client: S,
    span: Span,
}

impl<S: ObjectStore> MaterialStore<S> {
    /// Create a MaterialStore over an object store client.
    pub fn new(client: S) -> Self {
        Self {
            client,
            span: info_span!("material_store"),
        }
    }

    /// Builder method to set the logging context.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Get the underlying object store client.
    pub fn client(&self) -> &S {
        &self.client
    }

    /// Store the admin certificates.
    ///
    /// No-op when there are none, or when the only entry is empty.
    pub async fn create_admin_secret(
        &self,
        category: Category,
        node: &NodeRef,
        admin_certs: &[Vec<u8>],
    ) -> Result<(), MaterialError> {
        if admin_certs.is_empty() || (admin_certs.len() == 1 && admin_certs[0].is_empty()) {
            return Ok(());
        }
        self.upsert_list(MaterialKind::AdminCerts, category, node, admin_certs)
            .await
    }

    /// Store the CA certificates. No-op when there are none.
    pub async fn create_ca_certs_secret(
        &self,
        category: Category,
        node: &NodeRef,
        ca_certs: &[Vec<u8>],
    ) -> Result<(), MaterialError> {
        if ca_certs.is_empty() {
            return Ok(());
        }
        self.upsert_list(MaterialKind::CaCerts, category, node, ca_certs)
            .await
    }

    /// Store the intermediate certificates. No-op when there are none.
    pub async fn create_intermediate_certs_secret(
        &self,
        category: Category,
        node: &NodeRef,
        intermediate_certs: &[Vec<u8>],
    ) -> Result<(), MaterialError> {
        if intermediate_certs.is_empty() {
            return Ok(());
        }
        self.upsert_list(
            MaterialKind::IntermediateCerts,
            category,
            node,
            intermediate_certs,
        )
        .await
    }

    /// Store the signing certificate. No-op when empty.
    pub async fn create_sign_cert(
        &self,
        category: Category,
        node: &NodeRef,
        sign_cert: &[u8],
    ) -> Result<(), MaterialError> {
        if sign_cert.is_empty() {
            return Ok(());
        }
        self.upsert_single(MaterialKind::SignCert, category, node, sign_cert)
            .await
    }

    /// Store the private key. No-op when empty.
    pub async fn create_key(
        &self,
        category: Category,
        node: &NodeRef,
        key: &[u8],
    ) -> Result<(), MaterialError> {
        if key.is_empty() {
            return Ok(());
        }
        self.upsert_single(MaterialKind::Keystore, category, node, key)
            .await
    }

    /// Persist a bundle: admin, CA, intermediate, signcert, key, in that order.
    ///
    /// Admin certificates are not stored for the TLS category.
    pub async fn generate_secrets(
        &self,
        category: Category,
        node: &NodeRef,
        bundle: &CryptoBundle,
    ) -> Result<(), MaterialError> {
        let include_admin = category != Category::Tls;
        self.write_bundle(category, node, bundle, include_admin)
            .instrument(self.span.clone())
            .await?;
        info!(parent: &self.span, node = %node.name, category = %category, "Secrets generated");
        Ok(())
    }

    /// Persist a rotated bundle. Admin certificates are never touched here.
    pub async fn update_secrets(
        &self,
        category: Category,
        node: &NodeRef,
        bundle: &CryptoBundle,
    ) -> Result<(), MaterialError> {
        self.write_bundle(category, node, bundle, false)
            .instrument(self.span.clone())
            .await?;
        info!(parent: &self.span, node = %node.name, category = %category, "Secrets updated");
        Ok(())
    }

    /// Read a category back. Missing records leave their fields empty.
    pub async fn get_crypto_from_secrets(
        &self,
        category: Category,
        node: &NodeRef,
    ) -> Result<CryptoBundle, MaterialError> {
        async {
            let mut bundle = CryptoBundle::default();
            for kind in MaterialKind::ALL {
                let Some(record) = self.read_record(kind, category, node).await? else {
                    continue;
                };
                match kind {
                    MaterialKind::AdminCerts => bundle.admin_certs = list_blobs(kind, &record),
                    MaterialKind::CaCerts => bundle.ca_certs = list_blobs(kind, &record),
                    MaterialKind::IntermediateCerts => {
                        bundle.intermediate_certs = list_blobs(kind, &record)
                    }
                    MaterialKind::SignCert => bundle.sign_cert = single_blob(kind, &record),
                    MaterialKind::Keystore => bundle.private_key = single_blob(kind, &record),
                }
            }
            Ok(bundle)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Delete all five records of a category. Missing records are fine.
    pub async fn delete_secrets(
        &self,
        category: Category,
        node: &NodeRef,
    ) -> Result<(), MaterialError> {
        async {
            for kind in MaterialKind::ALL {
                let name = kind.record_name(category, &node.name);
                match self.client.delete(&node.namespace, &name).await {
                    Ok(()) => debug!(name = %name, "Secret deleted"),
                    Err(e) if e.is_not_found() => {}
                    Err(source) => return Err(MaterialError::Delete { name, source }),
                }
            }
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Generate secrets for every present category of a response.
    pub async fn generate_secrets_from_response(
        &self,
        node: &NodeRef,
        response: &CryptoBundleSet,
    ) -> Result<(), MaterialError> {
        for (category, bundle) in response.iter() {
            self.generate_secrets(category, node, bundle)
                .await
                .map_err(|e| category_error("generate", category, e))?;
        }
        Ok(())
    }

    /// Update secrets for every present category of a response.
    pub async fn update_secrets_from_response(
        &self,
        node: &NodeRef,
        response: &CryptoBundleSet,
    ) -> Result<(), MaterialError> {
        for (category, bundle) in response.iter() {
            self.update_secrets(category, node, bundle)
                .await
                .map_err(|e| category_error("update", category, e))?;
        }
        Ok(())
    }

    /// Read every category back. Categories with no stored material are `None`.
    pub async fn get_crypto_response_from_secrets(
        &self,
        node: &NodeRef,
    ) -> Result<CryptoBundleSet, MaterialError> {
        let mut response = CryptoBundleSet::new();
        for category in Category::ALL {
            let bundle = self
                .get_crypto_from_secrets(category, node)
                .await
                .map_err(|e| category_error("get", category, e))?;
            if !bundle.is_empty() {
                response.set(category, Some(bundle));
            }
        }
        Ok(response)
    }

    /// Delete the records of every category.
    pub async fn delete_all_secrets(&self, node: &NodeRef) -> Result<(), MaterialError> {
        for category in Category::ALL {
            self.delete_secrets(category, node)
                .await
                .map_err(|e| category_error("delete", category, e))?;
        }
        Ok(())
    }

    async fn write_bundle(
        &self,
        category: Category,
        node: &NodeRef,
        bundle: &CryptoBundle,
        include_admin: bool,
    ) -> Result<(), MaterialError> {
        if include_admin {
            self.create_admin_secret(category, node, &bundle.admin_certs)
                .await
                .map_err(|e| step_error(MaterialKind::AdminCerts, e))?;
        }
        self.create_ca_certs_secret(category, node, &bundle.ca_certs)
            .await
            .map_err(|e| step_error(MaterialKind::CaCerts, e))?;
        self.create_intermediate_certs_secret(category, node, &bundle.intermediate_certs)
            .await
            .map_err(|e| step_error(MaterialKind::IntermediateCerts, e))?;
        self.create_sign_cert(category, node, &bundle.sign_cert)
            .await
            .map_err(|e| step_error(MaterialKind::SignCert, e))?;
        self.create_key(category, node, &bundle.private_key)
            .await
            .map_err(|e| step_error(MaterialKind::Keystore, e))?;
        Ok(())
    }

    async fn upsert_list(
        &self,
        kind: MaterialKind,
        category: Category,
        node: &NodeRef,
        blobs: &[Vec<u8>],
    ) -> Result<(), MaterialError> {
        let prefix = kind.blob_prefix().unwrap_or(kind.suffix());
        let data = blobs
            .iter()
            .enumerate()
            .map(|(i, blob)| (format!("{}-{}.pem", prefix, i), blob.clone()))
            .collect();
        self.upsert(kind, category, node, data).await
    }

    async fn upsert_single(
        &self,
        kind: MaterialKind,
        category: Category,
        node: &NodeRef,
        blob: &[u8],
    ) -> Result<(), MaterialError> {
        let blob_name = kind.blob_name().unwrap_or("cert.pem");
        let data = BTreeMap::from([(blob_name.to_string(), blob.to_vec())]);
        self.upsert(kind, category, node, data).await
    }

    async fn upsert(
        &self,
        kind: MaterialKind,
        category: Category,
        node: &NodeRef,
        data: BTreeMap<String, Vec<u8>>,
    ) -> Result<(), MaterialError> {
        let name = kind.record_name(category, &node.name);
        let record = MaterialRecord {
            name: name.clone(),
            namespace: node.namespace.clone(),
            labels: node.labels.clone(),
            owner_references: vec![node.owner_reference()],
            data,
        };

        self.client
            .create_or_update(record)
            .await
            .map_err(|source| MaterialError::Upsert {
                name: name.clone(),
                source,
            })?;
        debug!(name = %name, namespace = %node.namespace, "Secret created/updated");
        Ok(())
    }

    async fn read_record(
        &self,
        kind: MaterialKind,
        category: Category,
        node: &NodeRef,
    ) -> Result<Option<MaterialRecord>, MaterialError> {
        let name = kind.record_name(category, &node.name);
        match self.client.get(&node.namespace, &name).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(source) => Err(MaterialError::Get { name, source }),
        }
    }
}

fn step_error(kind: MaterialKind, source: MaterialError) -> MaterialError {
    MaterialError::Step {
        kind,
        source: Box::new(source),
    }
}

fn category_error(action: &'static str, category: Category, source: MaterialError) -> MaterialError {
    MaterialError::Category {
        action,
        category,
        source: Box::new(source),
    }
}

/// Collect `<prefix>-<i>.pem` blobs ordered by index.
fn list_blobs(kind: MaterialKind, record: &MaterialRecord) -> Vec<Vec<u8>> {
    let prefix = format!("{}-", kind.blob_prefix().unwrap_or(kind.suffix()));
    let mut indexed: Vec<(usize, &Vec<u8>)> = record
        .data
        .iter()
        .filter_map(|(name, blob)| {
            let index = name.strip_prefix(&prefix)?.strip_suffix(".pem")?;
            index.parse::<usize>().ok().map(|i| (i, blob))
        })
        .collect();
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, blob)| blob.clone()).collect()
}

fn single_blob(kind: MaterialKind, record: &MaterialRecord) -> Vec<u8> {
    kind.blob_name()
        .and_then(|name| record.data.get(name))
        .cloned()
        .unwrap_or_default()
}
