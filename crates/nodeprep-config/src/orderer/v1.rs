//! Orderer configuration for 1.4.x.

use serde::{Deserialize, Serialize};

use super::{Consensus, Endpoint, FileLedger, General, Metrics, TraceDirs};
use crate::bccsp::Bccsp;
use crate::merge_struct;
use crate::node::NodeConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Orderer {
    pub general: GeneralV1,
    pub file_ledger: FileLedger,
    pub debug: TraceDirs,
    pub consensus: Consensus,
    pub operations: Endpoint,
    pub metrics: Metrics,
}
merge_struct!(Orderer {
    general,
    file_ledger,
    debug,
    consensus,
    operations,
    metrics
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GeneralV1 {
    #[serde(flatten)]
    pub base: General,
    pub ledger_type: String,
    pub genesis_method: String,
    pub genesis_profile: String,
    pub genesis_file: String,
}
merge_struct!(GeneralV1 {
    base,
    ledger_type,
    genesis_method,
    genesis_profile,
    genesis_file
});

impl NodeConfig for Orderer {
    fn bccsp_mut(&mut self) -> Option<&mut Bccsp> {
        self.general.base.bccsp.as_mut()
    }
}
