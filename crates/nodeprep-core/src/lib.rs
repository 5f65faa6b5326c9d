//! nodeprep Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/certificate authorities
//! - Object stores
//! - Runtime specifics
//!
//! All types here describe the crypto material and node identity that the
//! provisioning crates pass between each other.

pub mod bundle;
pub mod category;
pub mod error;
pub mod node;

// Re-export commonly used types
pub use bundle::{CryptoBundle, CryptoBundleSet};
pub use category::{Category, MaterialKind};
pub use error::CoreError;
pub use node::{NodeRef, NodeRole, OwnerReference};
