//! Organizational unit validation of generated certificates.
//!
//! The OU of a node's signing certificate carries its role
//! ("peer", "orderer", "client", "admin"). Admin certificates are accepted
//! as supplied and are not checked here.

use thiserror::Error;
use x509_parser::prelude::*;

use nodeprep_core::{CryptoBundle, CryptoBundleSet};

/// Problems with the OU field of a single certificate.
#[derive(Debug, Error)]
pub enum CertOuError {
    #[error("failed to parse certificate: {0}")]
    Parse(String),

    #[error("OU not defined")]
    NotDefined,

    #[error("cert does not have right OU, expecting '{0}'")]
    WrongOu(String),
}

/// OU validation failures, with the context of what was checked.
#[derive(Debug, Error)]
pub enum OuError {
    #[error("invalid OU for signcert: {0}")]
    SignCert(#[source] CertOuError),

    #[error("invalid OU for {role} identity: {source}")]
    Identity {
        role: String,
        #[source]
        source: Box<OuError>,
    },
}

/// Verify that the bundle's signing certificate carries `role` as an OU.
///
/// An empty signing certificate is accepted.
pub fn verify_cert_ou(bundle: &CryptoBundle, role: &str) -> Result<(), OuError> {
    if bundle.sign_cert.is_empty() {
        return Ok(());
    }

    check_ou(&bundle.sign_cert, role).map_err(OuError::SignCert)
}

/// Verify the node identity (enrollment bundle) of a response.
///
/// TLS and client-auth bundles are not role-bearing and are skipped.
pub fn verify_response_ou(response: &CryptoBundleSet, role: &str) -> Result<(), OuError> {
    if let Some(enrollment) = &response.enrollment {
        verify_cert_ou(enrollment, role).map_err(|e| OuError::Identity {
            role: role.to_string(),
            source: Box::new(e),
        })?;
    }
    Ok(())
}

fn check_ou(cert_bytes: &[u8], role: &str) -> Result<(), CertOuError> {
    let der = to_der(cert_bytes)?;
    let (_, cert) =
        X509Certificate::from_der(&der).map_err(|e| CertOuError::Parse(format!("{:?}", e)))?;

    let ous = organizational_units(&cert)?;
    if ous.is_empty() {
        return Err(CertOuError::NotDefined);
    }

    if ous.iter().any(|ou| ou.eq_ignore_ascii_case(role)) {
        Ok(())
    } else {
        Err(CertOuError::WrongOu(role.to_string()))
    }
}

/// Accept either PEM (leading whitespace allowed) or raw DER.
fn to_der(cert_bytes: &[u8]) -> Result<Vec<u8>, CertOuError> {
    match ::pem::parse(cert_bytes) {
        Ok(block) => Ok(block.into_contents()),
        Err(e) if looks_like_pem(cert_bytes) => Err(CertOuError::Parse(e.to_string())),
        Err(_) => Ok(cert_bytes.to_vec()),
    }
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"-----BEGIN")
}

fn organizational_units(cert: &X509Certificate<'_>) -> Result<Vec<String>, CertOuError> {
    cert.subject()
        .iter_organizational_unit()
        .map(|attr| {
            attr.as_str()
                .map(|s| s.to_string())
                .map_err(|e| CertOuError::Parse(format!("Failed to parse OU: {:?}", e)))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    pub(crate) fn generate_test_cert(ous: &[&str]) -> Vec<u8> {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "peer0");
        for ou in ous {
            dn.push(DnType::OrganizationalUnitName, *ou);
        }
        params.distinguished_name = dn;

        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();
        cert.pem().into_bytes()
    }

    fn bundle_with(cert: Vec<u8>) -> CryptoBundle {
        CryptoBundle::default().with_sign_cert(cert)
    }

    #[test]
    fn test_empty_signcert_is_accepted() {
        assert!(verify_cert_ou(&CryptoBundle::default(), "peer").is_ok());
    }

    #[test]
    fn test_missing_ou() {
        let err = verify_cert_ou(&bundle_with(generate_test_cert(&[])), "peer").unwrap_err();
        assert!(matches!(err, OuError::SignCert(CertOuError::NotDefined)));
        assert_eq!(err.to_string(), "invalid OU for signcert: OU not defined");
    }

    #[test]
    fn test_wrong_ou() {
        let err =
            verify_cert_ou(&bundle_with(generate_test_cert(&["invalidou"])), "peer").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid OU for signcert: cert does not have right OU, expecting 'peer'"
        );
    }

    #[test]
    fn test_matching_ou_is_case_insensitive() {
        let bundle = bundle_with(generate_test_cert(&["Peer"]));
        assert!(verify_cert_ou(&bundle, "peer").is_ok());
    }

    #[test]
    fn test_der_signcert() {
        let pem_bytes = generate_test_cert(&["orderer"]);
        let der = ::pem::parse(&pem_bytes).unwrap().into_contents();
        assert!(verify_cert_ou(&bundle_with(der), "orderer").is_ok());
    }

    #[test]
    fn test_pem_signcert_with_leading_whitespace() {
        let mut cert = b"\n  ".to_vec();
        cert.extend(generate_test_cert(&["peer"]));
        assert!(verify_cert_ou(&bundle_with(cert), "peer").is_ok());
    }

    #[test]
    fn test_garbage_signcert() {
        let err = verify_cert_ou(&bundle_with(b"not a cert".to_vec()), "peer").unwrap_err();
        assert!(matches!(err, OuError::SignCert(CertOuError::Parse(_))));
    }

    #[test]
    fn test_admin_certs_are_not_checked() {
        let bundle = bundle_with(generate_test_cert(&["peer"]))
            .with_admin_certs(vec![generate_test_cert(&["invalidou"])]);
        assert!(verify_cert_ou(&bundle, "peer").is_ok());
    }

    #[test]
    fn test_response_checks_enrollment_only() {
        let response = CryptoBundleSet {
            enrollment: Some(bundle_with(generate_test_cert(&["invalidou"]))),
            tls: Some(bundle_with(generate_test_cert(&[]))),
            client_auth: None,
        };
        let err = verify_response_ou(&response, "peer").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("invalid OU for peer identity: invalid OU for signcert"));

        let tls_only = CryptoBundleSet {
            tls: Some(bundle_with(generate_test_cert(&[]))),
            ..Default::default()
        };
        assert!(verify_response_ou(&tls_only, "peer").is_ok());
    }
}
