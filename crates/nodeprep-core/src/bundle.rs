//! Crypto bundle types.

use serde::{Deserialize, Serialize};

use crate::Category;

/// Certificates and key for one trust category of a node.
///
/// All certificates are kept as the raw bytes handed out by the provider
/// (PEM in practice). A bundle is never mutated once a provider returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoBundle {
    /// Root CA certificates.
    pub ca_certs: Vec<Vec<u8>>,

    /// Intermediate CA certificates.
    pub intermediate_certs: Vec<Vec<u8>>,

    /// Admin certificates.
    pub admin_certs: Vec<Vec<u8>>,

    /// Signing certificate of the node.
    pub sign_cert: Vec<u8>,

    /// Private key matching the signing certificate.
    pub private_key: Vec<u8>,
}

impl CryptoBundle {
    /// Returns true if the bundle carries no material at all.
    pub fn is_empty(&self) -> bool {
        self.ca_certs.is_empty()
            && self.intermediate_certs.is_empty()
            && self.admin_certs.is_empty()
            && self.sign_cert.is_empty()
            && self.private_key.is_empty()
    }

    /// Builder method to set the CA certificates.
    pub fn with_ca_certs(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.ca_certs = certs;
        self
    }

    /// Builder method to set the intermediate certificates.
    pub fn with_intermediate_certs(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.intermediate_certs = certs;
        self
    }

    /// Builder method to set the admin certificates.
    pub fn with_admin_certs(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.admin_certs = certs;
        self
    }

    /// Builder method to set the signing certificate.
    pub fn with_sign_cert(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.sign_cert = cert.into();
        self
    }

    /// Builder method to set the private key.
    pub fn with_private_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.private_key = key.into();
        self
    }
}

/// The three independent bundles of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoBundleSet {
    /// Node identity (enrollment certificate).
    pub enrollment: Option<CryptoBundle>,

    /// TLS server material.
    pub tls: Option<CryptoBundle>,

    /// Client authentication material.
    pub client_auth: Option<CryptoBundle>,
}

impl CryptoBundleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bundle for a category.
    pub fn get(&self, category: Category) -> Option<&CryptoBundle> {
        match category {
            Category::Enrollment => self.enrollment.as_ref(),
            Category::Tls => self.tls.as_ref(),
            Category::ClientAuth => self.client_auth.as_ref(),
        }
    }

    /// Set (or clear) the bundle for a category.
    pub fn set(&mut self, category: Category, bundle: Option<CryptoBundle>) {
        match category {
            Category::Enrollment => self.enrollment = bundle,
            Category::Tls => self.tls = bundle,
            Category::ClientAuth => self.client_auth = bundle,
        }
    }

    /// Builder method to set a bundle.
    pub fn with(mut self, category: Category, bundle: CryptoBundle) -> Self {
        self.set(category, Some(bundle));
        self
    }

    /// Iterate over present bundles in the fixed category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CryptoBundle)> {
        Category::ALL
            .into_iter()
            .filter_map(move |category| self.get(category).map(|b| (category, b)))
    }

    /// Returns true if no category is present.
    pub fn is_empty(&self) -> bool {
        self.enrollment.is_none() && self.tls.is_none() && self.client_auth.is_none()
    }
}
