//! Crypto service provider (BCCSP) settings and the PKCS11 defaults applied
//! after every merge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::merge_struct;

/// Provider name selecting the PKCS11 (HSM) implementation.
pub const PKCS11_PROVIDER: &str = "PKCS11";

/// Client library used when the node talks to the HSM through the proxy.
pub const PKCS11_PROXY_LIBRARY: &str = "/usr/local/lib/libpkcs11-proxy.so";

pub const DEFAULT_HASH: &str = "SHA2";
pub const DEFAULT_SECURITY: i32 = 256;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bccsp {
    #[serde(rename = "Default")]
    pub provider_name: String,
    #[serde(rename = "SW", skip_serializing_if = "Option::is_none")]
    pub sw: Option<SwOpts>,
    #[serde(rename = "PKCS11", skip_serializing_if = "Option::is_none")]
    pub pkcs11: Option<Pkcs11Opts>,
}
merge_struct!(Bccsp {
    provider_name,
    sw,
    pkcs11
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SwOpts {
    pub hash: String,
    pub security: i32,
    pub file_key_store: FileKeyStore,
}
merge_struct!(SwOpts {
    hash,
    security,
    file_key_store
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Pkcs11Opts {
    pub library: String,
    pub label: String,
    pub pin: String,
    pub hash: String,
    pub security: i32,
    pub software_verify: bool,
    pub immutable: bool,
    #[serde(rename = "AltID")]
    pub alt_id: String,
    pub file_key_store: FileKeyStore,
}
merge_struct!(Pkcs11Opts {
    library,
    label,
    pin,
    hash,
    security,
    software_verify,
    immutable,
    alt_id,
    file_key_store
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileKeyStore {
    #[serde(rename = "KeyStore")]
    pub key_store: String,
}
merge_struct!(FileKeyStore { key_store });

impl Bccsp {
    /// Whether the PKCS11 provider is selected (exact, case-sensitive name).
    pub fn is_pkcs11(&self) -> bool {
        self.provider_name == PKCS11_PROVIDER
    }

    /// Fill in the PKCS11 options a node needs to start against an HSM.
    ///
    /// No-op unless PKCS11 is selected. `SoftwareVerify` is always forced on.
    pub fn apply_pkcs11_defaults(&mut self, using_hsm_proxy: bool) {
        if !self.is_pkcs11() {
            return;
        }

        let opts = self.pkcs11.get_or_insert_with(Pkcs11Opts::default);
        if using_hsm_proxy {
            opts.library = PKCS11_PROXY_LIBRARY.to_string();
        }
        if opts.hash.is_empty() {
            opts.hash = DEFAULT_HASH.to_string();
        }
        if opts.security == 0 {
            opts.security = DEFAULT_SECURITY;
        }
        opts.software_verify = true;

        debug!(
            library = %opts.library,
            hash = %opts.hash,
            security = opts.security,
            "PKCS11 defaults applied"
        );
    }
}
