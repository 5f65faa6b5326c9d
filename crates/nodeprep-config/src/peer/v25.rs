//! Peer configuration for 2.5.x.

use serde::{Deserialize, Serialize};

use super::v2::{ChaincodeV2, Gateway, Limits, Snapshots};
use super::{Ledger, Metrics, Operations, Peer, Vm};
use crate::bccsp::Bccsp;
use crate::delivery::DeliveryClient;
use crate::error::ConfigError;
use crate::merge_struct;
use crate::node::NodeConfig;
use crate::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Core {
    pub peer: PeerV25,
    pub vm: Vm,
    pub chaincode: ChaincodeV2,
    pub ledger: LedgerV25,
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
pub struct PeerV25 {
    #[serde(flatten)]
    pub base: Peer,
    pub gateway: GatewayV25,
    pub limits: Limits,
}
merge_struct!(PeerV25 {
    base,
    gateway,
    limits
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayV25 {
    #[serde(flatten)]
    pub base: Gateway,
    pub broadcast_timeout: Duration,
}
merge_struct!(GatewayV25 {
    base,
    broadcast_timeout
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerV25 {
    #[serde(flatten)]
    pub base: Ledger,
    pub snapshots: Snapshots,
    pub pvtdata_store: PvtdataStore,
}
merge_struct!(LedgerV25 {
    base,
    snapshots,
    pvtdata_store
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PvtdataStore {
    pub coll_elg_proc_max_db_batch_size: i32,
    pub coll_elg_proc_db_batches_interval: i32,
    pub deprioritized_data_reconciler_interval: Duration,
    /// Blocks between purges of private data marked for deletion.
    pub purge_interval: i32,
}
merge_struct!(PvtdataStore {
    coll_elg_proc_max_db_batch_size,
    coll_elg_proc_db_batches_interval,
    deprioritized_data_reconciler_interval,
    purge_interval
});

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
