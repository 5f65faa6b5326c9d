//! Peer configuration for 2.x before 2.5.

use serde::{Deserialize, Serialize};

use super::{Chaincode, Ledger, Metrics, Operations, Peer, Vm};
use crate::bccsp::Bccsp;
use crate::delivery::DeliveryClient;
use crate::error::ConfigError;
use crate::merge_struct;
use crate::node::NodeConfig;
use crate::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Core {
    pub peer: PeerV2,
    pub vm: Vm,
    pub chaincode: ChaincodeV2,
    pub ledger: LedgerV2,
    pub operations: Operations,
    pub metrics: Metrics,
}
merge_struct!(Core {
    peer,
    vm,
    chaincode,
    ledger,
    operations,
    metrics
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerV2 {
    #[serde(flatten)]
    pub base: Peer,
    pub gateway: Gateway,
    pub limits: Limits,
}
merge_struct!(PeerV2 {
    base,
    gateway,
    limits
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Gateway {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub endorsement_timeout: Duration,
    pub dial_timeout: Duration,
}
merge_struct!(Gateway {
    enabled,
    endorsement_timeout,
    dial_timeout
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub concurrency: Concurrency,
}
merge_struct!(Limits { concurrency });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Concurrency {
    pub endorser_service: i32,
    pub deliver_service: i32,
    pub gateway_service: i32,
}
merge_struct!(Concurrency {
    endorser_service,
    deliver_service,
    gateway_service
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChaincodeV2 {
    #[serde(flatten)]
    pub base: Chaincode,
    pub external_builders: Vec<ExternalBuilder>,
    pub install_timeout: Duration,
}
merge_struct!(ChaincodeV2 {
    base,
    external_builders,
    install_timeout
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalBuilder {
    pub path: String,
    pub name: String,
    pub propagate_environment: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerV2 {
    #[serde(flatten)]
    pub base: Ledger,
    pub snapshots: Snapshots,
}
merge_struct!(LedgerV2 { base, snapshots });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshots {
    pub root_dir: String,
}
merge_struct!(Snapshots { root_dir });

impl NodeConfig for Core {
    fn parse(yaml: &str) -> Result<Self, ConfigError> {
        super::parse_with_legacy_bootstrap(yaml)
    }

    fn bccsp_mut(&mut self) -> Option<&mut Bccsp> {
        self.peer.base.bccsp.as_mut()
    }

    fn delivery_client(&self) -> Option<&DeliveryClient> {
        Some(&self.peer.base.deliveryclient)
    }

    fn delivery_client_mut(&mut self) -> Option<&mut DeliveryClient> {
        Some(&mut self.peer.base.deliveryclient)
    }
}
