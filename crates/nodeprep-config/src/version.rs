//! Selecting a configuration version from a Fabric release string.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A parsed `major.minor.patch` release, e.g. "2.5.4" or "v1.4.12-1".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FabricVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FromStr for FabricVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || ConfigError::UnsupportedVersion(s.to_string());

        let trimmed = s.trim().trim_start_matches('v');
        // drop build suffixes such as "-1"
        let core = trimmed.split(['-', '+']).next().unwrap_or_default();

        let mut parts = core.split('.');
        let mut next = || -> Result<u32, ConfigError> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| unsupported()),
                None => Ok(0),
            }
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() || core.is_empty() {
            return Err(unsupported());
        }

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for FabricVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Peer configuration layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerVersion {
    V1,
    V2,
    V25,
}

impl PeerVersion {
    pub fn from_fabric_version(version: &str) -> Result<Self, ConfigError> {
        let parsed: FabricVersion = version.parse()?;
        match (parsed.major, parsed.minor) {
            (1, _) => Ok(Self::V1),
            (2, minor) if minor < 5 => Ok(Self::V2),
            (2, _) => Ok(Self::V25),
            _ => Err(ConfigError::UnsupportedVersion(version.to_string())),
        }
    }
}

/// Orderer configuration layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdererVersion {
    V1,
    V2,
}

impl OrdererVersion {
    pub fn from_fabric_version(version: &str) -> Result<Self, ConfigError> {
        let parsed: FabricVersion = version.parse()?;
        match parsed.major {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            _ => Err(ConfigError::UnsupportedVersion(version.to_string())),
        }
    }
}
