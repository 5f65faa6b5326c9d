//! Orderer configuration for 2.x.

use serde::{Deserialize, Serialize};

use super::{Consensus, Endpoint, FileLedger, General, Metrics, TraceDirs};
use crate::bccsp::Bccsp;
use crate::merge_struct;
use crate::node::NodeConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Orderer {
    pub general: GeneralV2,
    pub file_ledger: FileLedger,
    pub debug: TraceDirs,
    pub consensus: Consensus,
    pub operations: Endpoint,
    pub metrics: Metrics,
    pub admin: Endpoint,
    pub channel_participation: ChannelParticipation,
}
merge_struct!(Orderer {
    general,
    file_ledger,
    debug,
    consensus,
    operations,
    metrics,
    admin,
    channel_participation
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GeneralV2 {
    #[serde(flatten)]
    pub base: General,
    pub bootstrap_method: String,
    pub bootstrap_file: String,
}
merge_struct!(GeneralV2 {
    base,
    bootstrap_method,
    bootstrap_file
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ChannelParticipation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub max_request_body_size: u64,
}
merge_struct!(ChannelParticipation {
    enabled,
    max_request_body_size
});

impl NodeConfig for Orderer {
    fn bccsp_mut(&mut self) -> Option<&mut Bccsp> {
        self.general.base.bccsp.as_mut()
    }
}
