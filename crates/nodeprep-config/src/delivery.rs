//! Peer delivery client settings and orderer address overrides.
//!
//! Overrides are declared with the orderer CA certificate embedded as base64
//! in `caCertsFile`. After a merge the field points at the file the node will
//! read (`/orderer/certs/cert<i>.pem`) and the decoded bytes are kept on the
//! [`DeliveryClient`] for the caller to write out.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::merge_struct;
use crate::{Duration, Merge};

/// Directory the node reads orderer CA certificates from.
pub const ORDERER_CERTS_DIR: &str = "/orderer/certs";

/// Path of the `index`th externalized orderer CA certificate.
pub fn ca_cert_path(index: usize) -> String {
    format!("{}/cert{}.pem", ORDERER_CERTS_DIR, index)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressOverride {
    pub from: String,
    pub to: String,
    pub ca_certs_file: String,
}
merge_struct!(AddressOverride {
    from,
    to,
    ca_certs_file
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliveryClient {
    pub reconnect_total_time_threshold: Duration,
    pub conn_timeout: Duration,
    pub re_connect_backoff_threshold: Duration,
    pub address_overrides: Vec<AddressOverride>,
    /// Block delivery policy (2.5 and later).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub policy: String,

    #[serde(skip)]
    address_override_certs: Vec<Vec<u8>>,
}

impl Merge for DeliveryClient {
    fn merge_from(&mut self, other: &Self) {
        let Self {
            reconnect_total_time_threshold,
            conn_timeout,
            re_connect_backoff_threshold,
            address_overrides,
            policy,
            address_override_certs: _,
        } = other;
        self.reconnect_total_time_threshold
            .merge_from(reconnect_total_time_threshold);
        self.conn_timeout.merge_from(conn_timeout);
        self.re_connect_backoff_threshold
            .merge_from(re_connect_backoff_threshold);
        self.address_overrides.merge_from(address_overrides);
        self.policy.merge_from(policy);
    }
}

impl DeliveryClient {
    /// Decoded CA certificates, index-aligned with `address_overrides`.
    ///
    /// An entry is empty when its override carries no certificate, or when it
    /// already pointed at an externalized file this process never decoded.
    pub fn address_override_certs(&self) -> &[Vec<u8>] {
        &self.address_override_certs
    }

    /// Rewrite embedded certificates to file references.
    ///
    /// Safe to run after every merge: entries that already hold the rewritten
    /// path keep the bytes decoded earlier.
    pub fn externalize_address_overrides(&mut self) -> Result<(), ConfigError> {
        let (rewritten, certs) =
            externalize_ca_certs(&self.address_overrides, &self.address_override_certs)?;
        self.address_overrides = rewritten;
        self.address_override_certs = certs;
        Ok(())
    }

    /// Write every decoded certificate as `<dir>/cert<i>.pem`.
    ///
    /// Returns the number of files written.
    pub fn write_address_override_certs(&self, dir: &Path) -> Result<usize, ConfigError> {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = 0;
        for (index, cert) in self.address_override_certs.iter().enumerate() {
            if cert.is_empty() {
                continue;
            }
            let path = dir.join(format!("cert{}.pem", index));
            crate::io::write_private(&path, cert)?;
            written += 1;
        }
        Ok(written)
    }
}

/// Decode each override's embedded base64 certificate.
///
/// Returns the overrides with `caCertsFile` rewritten to
/// [`ca_cert_path`]`(i)` and the decoded bytes in the same order. `known`
/// holds bytes from a previous pass; an entry already equal to its rewritten
/// path reuses `known[i]` instead of being decoded again.
pub fn externalize_ca_certs(
    entries: &[AddressOverride],
    known: &[Vec<u8>],
) -> Result<(Vec<AddressOverride>, Vec<Vec<u8>>), ConfigError> {
    let mut rewritten = Vec::with_capacity(entries.len());
    let mut certs = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let path = ca_cert_path(index);
        let mut entry = entry.clone();

        let bytes = if entry.ca_certs_file.is_empty() {
            Vec::new()
        } else if entry.ca_certs_file == path {
            known.get(index).cloned().unwrap_or_default()
        } else {
            let decoded = STANDARD
                .decode(entry.ca_certs_file.trim())
                .map_err(|source| ConfigError::AddressOverride { index, source })?;
            entry.ca_certs_file = path;
            decoded
        };

        debug!(index, from = %entry.from, to = %entry.to, bytes = bytes.len(), "Address override externalized");
        rewritten.push(entry);
        certs.push(bytes);
    }

    Ok((rewritten, certs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT: &[u8] = b"-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn entry(from: &str, cert: &str) -> AddressOverride {
        AddressOverride {
            from: from.to_string(),
            to: format!("{from}-override"),
            ca_certs_file: cert.to_string(),
        }
    }

    #[test]
    fn test_rewrites_and_decodes() {
        let encoded = STANDARD.encode(CERT);
        let entries = vec![entry("orderer0:7050", &encoded), entry("orderer1:7050", &encoded)];

        let (rewritten, certs) = externalize_ca_certs(&entries, &[]).unwrap();
        assert_eq!(rewritten[0].ca_certs_file, "/orderer/certs/cert0.pem");
        assert_eq!(rewritten[1].ca_certs_file, "/orderer/certs/cert1.pem");
        assert_eq!(rewritten[1].from, "orderer1:7050");
        assert_eq!(certs, vec![CERT.to_vec(), CERT.to_vec()]);
    }

    #[test]
    fn test_second_pass_is_stable() {
        let entries = vec![entry("orderer0:7050", &STANDARD.encode(CERT))];
        let (first, first_certs) = externalize_ca_certs(&entries, &[]).unwrap();
        let (second, second_certs) = externalize_ca_certs(&first, &first_certs).unwrap();
        assert_eq!(first, second);
        assert_eq!(first_certs, second_certs);
    }

    #[test]
    fn test_invalid_base64_aborts() {
        let entries = vec![
            entry("orderer0:7050", &STANDARD.encode(CERT)),
            entry("orderer1:7050", "not base64!"),
        ];
        let err = externalize_ca_certs(&entries, &[]).unwrap_err();
        assert!(matches!(err, ConfigError::AddressOverride { index: 1, .. }));
    }

    #[test]
    fn test_empty_entry_kept_aligned() {
        let entries = vec![entry("a:1", ""), entry("b:2", &STANDARD.encode(CERT))];
        let (rewritten, certs) = externalize_ca_certs(&entries, &[]).unwrap();
        assert_eq!(rewritten[0].ca_certs_file, "");
        assert!(certs[0].is_empty());
        assert_eq!(rewritten[1].ca_certs_file, ca_cert_path(1));
        assert_eq!(certs[1], CERT);
    }

    #[test]
    fn test_merge_replaces_overrides_and_keeps_certs_out() {
        let mut base = DeliveryClient {
            conn_timeout: Duration::from_secs(3),
            address_overrides: vec![entry("old:7050", &STANDARD.encode(CERT))],
            ..Default::default()
        };
        base.externalize_address_overrides().unwrap();

        let overrides = DeliveryClient {
            address_overrides: vec![
                entry("new0:7050", &STANDARD.encode(CERT)),
                entry("new1:7050", &STANDARD.encode(b"second")),
            ],
            ..Default::default()
        };
        base.merge_from(&overrides);
        base.externalize_address_overrides().unwrap();

        assert_eq!(base.conn_timeout, Duration::from_secs(3));
        assert_eq!(base.address_overrides.len(), 2);
        assert_eq!(base.address_override_certs()[1], b"second".to_vec());
    }

    #[test]
    fn test_write_certs() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = DeliveryClient {
            address_overrides: vec![entry("a:1", ""), entry("b:2", &STANDARD.encode(CERT))],
            ..Default::default()
        };
        client.externalize_address_overrides().unwrap();

        let written = client.write_address_override_certs(dir.path()).unwrap();
        assert_eq!(written, 1);
        assert!(!dir.path().join("cert0.pem").exists());
        assert_eq!(std::fs::read(dir.path().join("cert1.pem")).unwrap(), CERT);
    }
}
