//! HSM support for ledger node pods.
//!
//! An [`HsmDescriptor`] says where the vendor PKCS11 library lives, which
//! secrets the library needs mounted, and optionally a daemon that must run
//! next to the node. [`HsmProjector`] turns it into volumes, mounts,
//! environment and containers on a [`PodSpec`].

pub mod descriptor;
pub mod error;
pub mod pod;
pub mod projector;

pub use descriptor::{Daemon, HsmDescriptor, Library, MountSpec, SecurityOverrides};
pub use error::HsmError;
pub use pod::{Container, EnvVar, PodSpec, Volume, VolumeMount, VolumeSource};
pub use projector::{wrap_with_daemon_barrier, HsmMode, HsmProjector};
