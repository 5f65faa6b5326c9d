//! Peer configuration for 1.4.x.

use serde::{Deserialize, Serialize};

use super::{Chaincode, Ledger, Metrics, Operations, Peer, Vm};
use crate::bccsp::Bccsp;
use crate::delivery::DeliveryClient;
use crate::error::ConfigError;
use crate::merge_struct;
use crate::node::NodeConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Core {
    pub peer: Peer,
    pub vm: Vm,
    pub chaincode: Chaincode,
    pub ledger: Ledger,
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

impl NodeConfig for Core {
    fn parse(yaml: &str) -> Result<Self, ConfigError> {
        super::parse_with_legacy_bootstrap(yaml)
    }

    fn bccsp_mut(&mut self) -> Option<&mut Bccsp> {
        self.peer.bccsp.as_mut()
    }

    fn delivery_client(&self) -> Option<&DeliveryClient> {
        Some(&self.peer.deliveryclient)
    }

    fn delivery_client_mut(&mut self) -> Option<&mut DeliveryClient> {
        Some(&mut self.peer.deliveryclient)
    }
}
