//! Crypto material provisioning for ledger nodes.
//!
//! A provisioning request flows through these pieces in order:
//!
//! 1. [`CryptoOrchestrator`] asks each configured [`CryptoProvider`]
//!    (enrollment against a CA, or pre-supplied MSP material) for a bundle.
//! 2. [`verify_response_ou`] checks the node identity against its role.
//! 3. [`MaterialStore`] persists every bundle as named records in an
//!    [`ObjectStore`].
//!
//! [`Provisioner`] runs the three steps for one node.

pub mod enroll;
pub mod error;
pub mod material;
pub mod msp;
pub mod orchestrator;
pub mod ou;
pub mod provider;
pub mod provision;
pub mod store;

pub use enroll::{EnrollmentProvider, EnrollmentSpec};
pub use error::{CryptoError, MaterialError, ProviderError, ProvisionError};
pub use material::MaterialStore;
pub use msp::{MspProvider, MspSpec};
pub use orchestrator::{get_crypto, CryptoOrchestrator};
pub use ou::{verify_cert_ou, verify_response_ou, CertOuError, OuError};
pub use provider::CryptoProvider;
pub use provision::Provisioner;
pub use store::{FileStore, MaterialRecord, MemoryStore, ObjectStore, StoreError};
