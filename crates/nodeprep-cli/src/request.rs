//! Provisioning request files.
//!
//! ```yaml
//! enrollment:
//!   ca:
//!     caHost: ca.org1.example.com
//!     caPort: "7054"
//!     caName: ca
//!     catls:
//!       cacert: <base64 PEM>
//!     enrollId: peer0
//!     enrollSecret: peer0pw
//! tls:
//!   msp:
//!     keystore: <base64 PEM>
//!     signcerts: <base64 PEM>
//!     cacerts: [<base64 PEM>]
//! ```

use std::path::Path;

use serde::Deserialize;

use nodeprep_core::Category;
use nodeprep_crypto::{CryptoOrchestrator, EnrollmentProvider, EnrollmentSpec, MspProvider, MspSpec};

/// Where one bundle comes from. Exactly one source must be set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SourceSpec {
    pub ca: Option<EnrollmentSpec>,
    pub msp: Option<MspSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProvisionRequest {
    pub enrollment: Option<SourceSpec>,
    pub tls: Option<SourceSpec>,
    pub clientauth: Option<SourceSpec>,
}

impl ProvisionRequest {
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read request '{}': {}", path.display(), e))?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Build an orchestrator with one provider per declared category.
    pub fn orchestrator(self) -> Result<CryptoOrchestrator, Box<dyn std::error::Error>> {
        let mut orchestrator = CryptoOrchestrator::new();
        let sources = [
            (Category::Enrollment, self.enrollment),
            (Category::Tls, self.tls),
            (Category::ClientAuth, self.clientauth),
        ];

        for (category, source) in sources {
            let Some(source) = source else {
                continue;
            };
            orchestrator = match (source.ca, source.msp) {
                (Some(ca), None) if category == Category::Tls => {
                    orchestrator.with_provider(category, EnrollmentProvider::tls(ca))
                }
                (Some(ca), None) => orchestrator.with_provider(category, EnrollmentProvider::new(ca)),
                (None, Some(msp)) => orchestrator.with_provider(category, MspProvider::new(msp)),
                (Some(_), Some(_)) => {
                    return Err(format!("{category}: set either 'ca' or 'msp', not both").into())
                }
                (None, None) => return Err(format!("{category}: no crypto source declared").into()),
            };
        }
        Ok(orchestrator)
    }
}
