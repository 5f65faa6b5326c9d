//! Versioned node configurations and the override merge engine.
//!
//! A node starts from a baseline configuration for its release and the user
//! supplies overrides in the same shape. [`NodeConfig::merge_with`] merges
//! the two, fills in PKCS11 defaults when an HSM is selected and moves
//! embedded orderer CA certificates out of the document.
//!
//! ```no_run
//! use std::path::Path;
//! use nodeprep_config::{peer, NodeConfig};
//!
//! # fn main() -> Result<(), nodeprep_config::ConfigError> {
//! let mut core = peer::v2::Core::read_from(Path::new("core.yaml"))?;
//! let overrides = peer::v2::Core::read_from(Path::new("overrides.yaml"))?;
//! core.merge_with(&overrides, true)?;
//! core.write_to(Path::new("/config/core.yaml"))?;
//! # Ok(())
//! # }
//! ```

pub mod bccsp;
pub mod common;
pub mod delivery;
pub mod duration;
pub mod error;
mod io;
pub mod merge;
pub mod node;
pub mod orderer;
pub mod peer;
pub mod version;

pub use bccsp::{Bccsp, Pkcs11Opts, SwOpts};
pub use delivery::{externalize_ca_certs, AddressOverride, DeliveryClient};
pub use duration::Duration;
pub use error::ConfigError;
pub use merge::Merge;
pub use node::{merge_files, NodeConfig};
pub use version::{FabricVersion, OrdererVersion, PeerVersion};
