//! Provider that enrolls against a certificate authority.
//!
//! Talks to a Fabric-CA style REST endpoint:
//! - `GET  /cainfo?ca=<name>` for reachability
//! - `POST /enroll` (HTTP basic auth with the enroll id/secret) with a CSR
//!   generated locally; the private key never leaves this process.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use x509_parser::prelude::*;

use nodeprep_core::CryptoBundle;

use crate::error::ProviderError;
use crate::provider::CryptoProvider;

/// TLS settings for reaching the CA.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaTls {
    /// CA TLS certificate, base64 encoded PEM.
    #[serde(default)]
    pub ca_cert: String,
}

/// Subject details of the requested certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrSpec {
    /// Subject alternative names.
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Common name; defaults to the enroll id.
    #[serde(default)]
    pub cn: Option<String>,
}

/// Enrollment request for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSpec {
    #[serde(default)]
    pub ca_host: String,

    #[serde(default)]
    pub ca_port: String,

    #[serde(default)]
    pub ca_name: String,

    #[serde(default, rename = "catls")]
    pub ca_tls: CaTls,

    #[serde(default)]
    pub enroll_id: String,

    #[serde(default)]
    pub enroll_secret: String,

    /// Admin certificates (base64 PEM) attached to the bundle as-is.
    #[serde(default)]
    pub admin_certs: Vec<String>,

    #[serde(default)]
    pub csr: CsrSpec,
}

impl EnrollmentSpec {
    /// Base URL of the CA.
    pub fn url(&self) -> String {
        format!("https://{}:{}", self.ca_host, self.ca_port)
    }
}

/// Request body of `POST /enroll`.
#[derive(Debug, Serialize)]
struct EnrollRequest<'a> {
    certificate_request: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    profile: &'a str,
    caname: &'a str,
}

/// Response envelope of the CA.
#[derive(Debug, Deserialize)]
struct CaResponse {
    #[serde(default)]
    success: bool,
    result: Option<EnrollResult>,
    #[serde(default)]
    errors: Vec<CaMessage>,
}

#[derive(Debug, Deserialize)]
struct CaMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct EnrollResult {
    #[serde(rename = "Cert")]
    cert: String,
    #[serde(rename = "ServerInfo")]
    server_info: ServerInfo,
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    #[serde(rename = "CAName", default)]
    ca_name: String,
    #[serde(rename = "CAChain", default)]
    ca_chain: String,
}

/// Issued material pulled out of an enroll response.
#[derive(Debug)]
struct Enrolled {
    sign_cert: Vec<u8>,
    ca_certs: Vec<Vec<u8>>,
    intermediate_certs: Vec<Vec<u8>>,
}

/// Enrolls against a CA to obtain a fresh certificate and key.
#[derive(Debug, Clone)]
pub struct EnrollmentProvider {
    spec: EnrollmentSpec,
    profile: String,
}

impl EnrollmentProvider {
    /// Create a provider issuing with the CA's default profile.
    pub fn new(spec: EnrollmentSpec) -> Self {
        Self {
            spec,
            profile: String::new(),
        }
    }

    /// Create a provider issuing TLS certificates.
    pub fn tls(spec: EnrollmentSpec) -> Self {
        Self::new(spec).with_profile("tls")
    }

    /// Builder method to set the signing profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    fn tls_cert_pem(&self) -> Result<Vec<u8>, ProviderError> {
        let bytes = STANDARD
            .decode(self.spec.ca_tls.ca_cert.trim())
            .map_err(|source| ProviderError::Decode {
                field: "catls.cacert".to_string(),
                source,
            })?;
        ::pem::parse(&bytes).map_err(|e| ProviderError::InvalidPem {
            field: "catls.cacert".to_string(),
            message: e.to_string(),
        })?;
        Ok(bytes)
    }

    fn http_client(&self) -> Result<reqwest::Client, ProviderError> {
        let pem = self.tls_cert_pem()?;
        let root = reqwest::Certificate::from_pem(&pem).map_err(|e| ProviderError::InvalidPem {
            field: "catls.cacert".to_string(),
            message: e.to_string(),
        })?;

        reqwest::Client::builder()
            .add_root_certificate(root)
            .build()
            .map_err(|e| ProviderError::Request {
                url: self.spec.url(),
                message: e.to_string(),
            })
    }

    /// Generate the key pair and a PEM CSR for it.
    fn generate_csr(&self) -> Result<(KeyPair, String), ProviderError> {
        let key_pair = KeyPair::generate().map_err(|e| ProviderError::Csr(e.to_string()))?;

        let mut params = CertificateParams::new(self.spec.csr.hosts.clone())
            .map_err(|e| ProviderError::Csr(e.to_string()))?;
        let cn = self
            .spec
            .csr
            .cn
            .clone()
            .unwrap_or_else(|| self.spec.enroll_id.clone());
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, cn);
        params.distinguished_name = dn;

        let csr = params
            .serialize_request(&key_pair)
            .map_err(|e| ProviderError::Csr(e.to_string()))?;
        let csr_pem = csr.pem().map_err(|e| ProviderError::Csr(e.to_string()))?;

        Ok((key_pair, csr_pem))
    }

    fn admin_certs(&self) -> Result<Vec<Vec<u8>>, ProviderError> {
        self.spec
            .admin_certs
            .iter()
            .enumerate()
            .map(|(i, cert)| {
                STANDARD
                    .decode(cert.trim())
                    .map_err(|source| ProviderError::Decode {
                        field: format!("adminCerts[{}]", i),
                        source,
                    })
            })
            .collect()
    }
}

#[async_trait]
impl CryptoProvider for EnrollmentProvider {
    async fn ping(&self) -> Result<(), ProviderError> {
        let client = self.http_client()?;
        let url = format!("{}/cainfo", self.spec.url());
        debug!(url = %url, ca = %self.spec.ca_name, "Pinging CA");

        let response = client
            .get(&url)
            .query(&[("ca", self.spec.ca_name.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                message: format!("GET {}", url),
            });
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ProviderError> {
        let spec = &self.spec;
        if spec.ca_host.is_empty() {
            return Err(ProviderError::MissingField("ca host"));
        }
        if spec.ca_port.is_empty() {
            return Err(ProviderError::MissingField("ca port"));
        }
        if spec.ca_name.is_empty() {
            return Err(ProviderError::MissingField("ca name"));
        }
        if spec.ca_tls.ca_cert.is_empty() {
            return Err(ProviderError::MissingField("ca tls cert"));
        }
        if spec.enroll_id.is_empty() {
            return Err(ProviderError::MissingField("enroll id"));
        }
        if spec.enroll_secret.is_empty() {
            return Err(ProviderError::MissingField("enroll secret"));
        }
        self.tls_cert_pem()?;
        self.admin_certs()?;
        Ok(())
    }

    async fn fetch(&self) -> Result<CryptoBundle, ProviderError> {
        let (key_pair, csr_pem) = self.generate_csr()?;
        let client = self.http_client()?;
        let url = format!("{}/enroll", self.spec.url());

        let request = EnrollRequest {
            certificate_request: &csr_pem,
            profile: &self.profile,
            caname: &self.spec.ca_name,
        };

        let response = client
            .post(&url)
            .basic_auth(&self.spec.enroll_id, Some(&self.spec.enroll_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ProviderError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let enrolled = parse_enroll_response(&body)?;
        info!(
            enroll_id = %self.spec.enroll_id,
            ca = %self.spec.ca_name,
            intermediates = enrolled.intermediate_certs.len(),
            "Enrollment certificate issued"
        );

        Ok(CryptoBundle {
            ca_certs: enrolled.ca_certs,
            intermediate_certs: enrolled.intermediate_certs,
            admin_certs: self.admin_certs()?,
            sign_cert: enrolled.sign_cert,
            private_key: key_pair.serialize_pem().into_bytes(),
        })
    }
}

fn parse_enroll_response(body: &str) -> Result<Enrolled, ProviderError> {
    let response: CaResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Enroll(e.to_string()))?;

    let result = match (response.success, response.result) {
        (true, Some(result)) => result,
        (_, _) => {
            let message = response
                .errors
                .iter()
                .map(|e| format!("code {}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ProviderError::Enroll(if message.is_empty() {
                "CA reported failure without details".to_string()
            } else {
                message
            }));
        }
    };

    let sign_cert = STANDARD
        .decode(result.cert.trim())
        .map_err(|source| ProviderError::Decode {
            field: "Cert".to_string(),
            source,
        })?;
    let chain = STANDARD
        .decode(result.server_info.ca_chain.trim())
        .map_err(|source| ProviderError::Decode {
            field: "CAChain".to_string(),
            source,
        })?;

    let (ca_certs, intermediate_certs) = split_chain(&chain)?;
    debug!(ca = %result.server_info.ca_name, roots = ca_certs.len(), "CA chain received");

    Ok(Enrolled {
        sign_cert,
        ca_certs,
        intermediate_certs,
    })
}

/// Split a PEM chain into self-signed roots and intermediates.
fn split_chain(chain: &[u8]) -> Result<(Vec<Vec<u8>>, Vec<Vec<u8>>), ProviderError> {
    let blocks = ::pem::parse_many(chain).map_err(|e| ProviderError::InvalidPem {
        field: "CAChain".to_string(),
        message: e.to_string(),
    })?;

    let mut roots = Vec::new();
    let mut intermediates = Vec::new();
    for block in blocks {
        let (_, cert) = X509Certificate::from_der(block.contents())
            .map_err(|e| ProviderError::ParseCert(format!("{:?}", e)))?;
        let self_signed = cert.subject().as_raw() == cert.issuer().as_raw();

        let encoded = ::pem::encode(&block).into_bytes();
        if self_signed {
            roots.push(encoded);
        } else {
            intermediates.push(encoded);
        }
    }

    Ok((roots, intermediates))
}
