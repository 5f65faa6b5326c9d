//! Peer configurations (`core.yaml`).
//!
//! [`v1`] is the 1.4 layout. [`v2`] and [`v25`] extend its sections by
//! flattening them and adding the keys introduced by later releases.

pub mod v1;
pub mod v2;
pub mod v25;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::warn;

use crate::bccsp::Bccsp;
use crate::common::{File, Files};
use crate::delivery::DeliveryClient;
use crate::error::ConfigError;
use crate::merge_struct;
use crate::Duration;

/// Parse a peer configuration, upgrading the legacy scalar
/// `peer.gossip.bootstrap` to a list if the first attempt fails.
pub(crate) fn parse_with_legacy_bootstrap<T: DeserializeOwned>(yaml: &str) -> Result<T, ConfigError> {
    let modern = match serde_yaml::from_str(yaml) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };

    let mut value: Value = serde_yaml::from_str(yaml).map_err(ConfigError::Parse)?;
    if !rewrite_bootstrap(&mut value) {
        return Err(ConfigError::Parse(modern));
    }
    warn!(error = %modern, "Parsed peer config with scalar gossip bootstrap");

    serde_yaml::from_value(value).map_err(|legacy| ConfigError::Legacy { modern, legacy })
}

/// Turn `peer.gossip.bootstrap: <scalar>` into a one-element sequence.
fn rewrite_bootstrap(value: &mut Value) -> bool {
    let Some(bootstrap) = value
        .get_mut("peer")
        .and_then(|peer| peer.get_mut("gossip"))
        .and_then(|gossip| gossip.get_mut("bootstrap"))
    else {
        return false;
    };

    match bootstrap {
        Value::String(_) | Value::Number(_) => {
            let scalar = std::mem::take(bootstrap);
            *bootstrap = Value::Sequence(vec![scalar]);
            true
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Peer {
    pub id: String,
    pub network_id: String,
    pub listen_address: String,
    pub chaincode_listen_address: String,
    pub chaincode_address: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_auto_detect: Option<bool>,
    pub keepalive: Keepalive,
    pub gossip: Gossip,
    pub tls: PeerTls,
    pub authentication: Authentication,
    pub file_system_path: String,
    #[serde(rename = "BCCSP", skip_serializing_if = "Option::is_none")]
    pub bccsp: Option<Bccsp>,
    pub msp_config_path: String,
    pub local_msp_id: String,
    pub local_msp_type: String,
    pub client: Client,
    pub deliveryclient: DeliveryClient,
    pub profile: Profile,
    pub validator_pool_size: i32,
    pub discovery: Discovery,
}
merge_struct!(Peer {
    id,
    network_id,
    listen_address,
    chaincode_listen_address,
    chaincode_address,
    address,
    address_auto_detect,
    keepalive,
    gossip,
    tls,
    authentication,
    file_system_path,
    bccsp,
    msp_config_path,
    local_msp_id,
    local_msp_type,
    client,
    deliveryclient,
    profile,
    validator_pool_size,
    discovery
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Keepalive {
    pub interval: Duration,
    pub timeout: Duration,
    pub min_interval: Duration,
    pub client: KeepaliveClient,
    pub delivery_client: KeepaliveClient,
}
merge_struct!(Keepalive {
    interval,
    timeout,
    min_interval,
    client,
    delivery_client
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveClient {
    pub interval: Duration,
    pub timeout: Duration,
}
merge_struct!(KeepaliveClient { interval, timeout });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Gossip {
    pub bootstrap: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_leader_election: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_leader: Option<bool>,
    pub membership_tracker_interval: Duration,
    pub endpoint: String,
    pub max_block_count_to_store: i32,
    pub max_propagation_burst_latency: Duration,
    pub max_propagation_burst_size: i32,
    pub propagate_iterations: i32,
    pub propagate_peer_num: i32,
    pub pull_interval: Duration,
    pub pull_peer_num: i32,
    pub request_state_info_interval: Duration,
    pub publish_state_info_interval: Duration,
    pub state_info_retention_interval: Duration,
    pub publish_cert_period: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_block_verification: Option<bool>,
    pub dial_timeout: Duration,
    pub conn_timeout: Duration,
    pub recv_buff_size: i32,
    pub send_buff_size: i32,
    pub digest_wait_time: Duration,
    pub request_wait_time: Duration,
    pub response_wait_time: Duration,
    pub alive_time_interval: Duration,
    pub alive_expiration_timeout: Duration,
    pub reconnect_interval: Duration,
    pub external_endpoint: String,
    pub election: Election,
    pub pvt_data: PvtData,
    pub state: GossipState,
}
merge_struct!(Gossip {
    bootstrap,
    use_leader_election,
    org_leader,
    membership_tracker_interval,
    endpoint,
    max_block_count_to_store,
    max_propagation_burst_latency,
    max_propagation_burst_size,
    propagate_iterations,
    propagate_peer_num,
    pull_interval,
    pull_peer_num,
    request_state_info_interval,
    publish_state_info_interval,
    state_info_retention_interval,
    publish_cert_period,
    skip_block_verification,
    dial_timeout,
    conn_timeout,
    recv_buff_size,
    send_buff_size,
    digest_wait_time,
    request_wait_time,
    response_wait_time,
    alive_time_interval,
    alive_expiration_timeout,
    reconnect_interval,
    external_endpoint,
    election,
    pvt_data,
    state
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Election {
    pub startup_grace_period: Duration,
    pub membership_sample_interval: Duration,
    pub leader_alive_threshold: Duration,
    pub leader_election_duration: Duration,
}
merge_struct!(Election {
    startup_grace_period,
    membership_sample_interval,
    leader_alive_threshold,
    leader_election_duration
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PvtData {
    pub pull_retry_threshold: Duration,
    pub transient_store_max_block_retention: u64,
    pub push_ack_timeout: Duration,
    pub btl_pull_margin: u64,
    pub reconcile_batch_size: i32,
    pub reconcile_sleep_interval: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_pulling_invalid_transactions_during_commit: Option<bool>,
}
merge_struct!(PvtData {
    pull_retry_threshold,
    transient_store_max_block_retention,
    push_ack_timeout,
    btl_pull_margin,
    reconcile_batch_size,
    reconcile_sleep_interval,
    reconciliation_enabled,
    skip_pulling_invalid_transactions_during_commit
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GossipState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub check_interval: Duration,
    pub response_timeout: Duration,
    pub batch_size: i32,
    pub block_buffer_size: i32,
    pub max_retries: i32,
}
merge_struct!(GossipState {
    enabled,
    check_interval,
    response_timeout,
    batch_size,
    block_buffer_size,
    max_retries
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeerTls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_auth_required: Option<bool>,
    pub cert: File,
    pub key: File,
    pub rootcert: File,
    #[serde(rename = "clientRootCAs")]
    pub client_root_cas: Files,
    pub client_key: File,
    pub client_cert: File,
}
merge_struct!(PeerTls {
    enabled,
    client_auth_required,
    cert,
    key,
    rootcert,
    client_root_cas,
    client_key,
    client_cert
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authentication {
    pub timewindow: Duration,
}
merge_struct!(Authentication { timewindow });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Client {
    pub conn_timeout: Duration,
}
merge_struct!(Client { conn_timeout });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub listen_address: String,
}
merge_struct!(Profile {
    enabled,
    listen_address
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Discovery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_cache_enabled: Option<bool>,
    pub auth_cache_max_size: i32,
    pub auth_cache_purge_retention_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_members_allowed_access: Option<bool>,
}
merge_struct!(Discovery {
    enabled,
    auth_cache_enabled,
    auth_cache_max_size,
    auth_cache_purge_retention_ratio,
    org_members_allowed_access
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vm {
    pub endpoint: String,
    pub docker: Docker,
}
merge_struct!(Vm { endpoint, docker });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Docker {
    pub tls: DockerTls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attach_stdout: Option<bool>,
    pub host_config: BTreeMap<String, Value>,
}
merge_struct!(Docker {
    tls,
    attach_stdout,
    host_config
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerTls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub ca: File,
    pub cert: File,
    pub key: File,
}
merge_struct!(DockerTls {
    enabled,
    ca,
    cert,
    key
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chaincode {
    pub id: ChaincodeId,
    pub builder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull: Option<bool>,
    pub golang: Golang,
    pub java: Runtime,
    pub node: Runtime,
    pub startuptimeout: Duration,
    pub executetimeout: Duration,
    pub mode: String,
    pub keepalive: i32,
    pub system: BTreeMap<String, String>,
    pub logging: ChaincodeLogging,
}
merge_struct!(Chaincode {
    id,
    builder,
    pull,
    golang,
    java,
    node,
    startuptimeout,
    executetimeout,
    mode,
    keepalive,
    system,
    logging
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaincodeId {
    pub path: String,
    pub name: String,
}
merge_struct!(ChaincodeId { path, name });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Golang {
    pub runtime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_link: Option<bool>,
}
merge_struct!(Golang {
    runtime,
    dynamic_link
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Runtime {
    pub runtime: String,
}
merge_struct!(Runtime { runtime });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaincodeLogging {
    pub level: String,
    pub shim: String,
    pub format: String,
}
merge_struct!(ChaincodeLogging {
    level,
    shim,
    format
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ledger {
    pub state: LedgerState,
    pub history: History,
}
merge_struct!(Ledger { state, history });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerState {
    pub state_database: String,
    pub total_query_limit: i32,
    #[serde(rename = "couchDBConfig")]
    pub couch_db_config: CouchDbConfig,
}
merge_struct!(LedgerState {
    state_database,
    total_query_limit,
    couch_db_config
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CouchDbConfig {
    #[serde(rename = "couchDBAddress")]
    pub couch_db_address: String,
    pub username: String,
    pub password: String,
    pub max_retries: i32,
    pub max_retries_on_startup: i32,
    pub request_timeout: Duration,
    pub internal_query_limit: i32,
    pub max_batch_update_size: i32,
    pub warm_indexes_after_n_blocks: i32,
    #[serde(rename = "createGlobalChangesDB", skip_serializing_if = "Option::is_none")]
    pub create_global_changes_db: Option<bool>,
    pub cache_size: i32,
}
merge_struct!(CouchDbConfig {
    couch_db_address,
    username,
    password,
    max_retries,
    max_retries_on_startup,
    request_timeout,
    internal_query_limit,
    max_batch_update_size,
    warm_indexes_after_n_blocks,
    create_global_changes_db,
    cache_size
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct History {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_history_database: Option<bool>,
}
merge_struct!(History {
    enable_history_database
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operations {
    pub listen_address: String,
    pub tls: OperationsTls,
}
merge_struct!(Operations {
    listen_address,
    tls
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationsTls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub cert: File,
    pub key: File,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_auth_required: Option<bool>,
    #[serde(rename = "clientRootCAs")]
    pub client_root_cas: Files,
}
merge_struct!(OperationsTls {
    enabled,
    cert,
    key,
    client_auth_required,
    client_root_cas
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub provider: String,
    pub statsd: Statsd,
}
merge_struct!(Metrics { provider, statsd });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Statsd {
    pub network: String,
    pub address: String,
    pub write_interval: Duration,
    pub prefix: String,
}
merge_struct!(Statsd {
    network,
    address,
    write_interval,
    prefix
});

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Root {
        peer: Peer,
    }

    #[test]
    fn test_modern_bootstrap_list() {
        let root: Root =
            parse_with_legacy_bootstrap("peer:\n  gossip:\n    bootstrap:\n      - a:7051\n      - b:7051\n")
                .unwrap();
        assert_eq!(root.peer.gossip.bootstrap, vec!["a:7051", "b:7051"]);
    }

    #[test]
    fn test_legacy_scalar_bootstrap() {
        let root: Root =
            parse_with_legacy_bootstrap("peer:\n  id: peer0\n  gossip:\n    bootstrap: 127.0.0.1:7051\n")
                .unwrap();
        assert_eq!(root.peer.id, "peer0");
        assert_eq!(root.peer.gossip.bootstrap, vec!["127.0.0.1:7051"]);
    }

    #[test]
    fn test_unrelated_error_is_not_rewritten() {
        let err = parse_with_legacy_bootstrap::<Root>("peer:\n  id: [1, 2]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_legacy_failure_reports_both() {
        let yaml = "peer:\n  id: [1, 2]\n  gossip:\n    bootstrap: 127.0.0.1:7051\n";
        let err = parse_with_legacy_bootstrap::<Root>(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Legacy { .. }));
    }

    #[test]
    fn test_yaml_key_names() {
        let yaml = "peer:\n  localMspId: Org1MSP\n  tls:\n    clientRootCAs:\n      files: [/certs/ca.pem]\n  keepalive:\n    minInterval: 60s\n";
        let root: Root = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(root.peer.local_msp_id, "Org1MSP");
        assert_eq!(root.peer.tls.client_root_cas.files, vec!["/certs/ca.pem"]);
        assert_eq!(root.peer.keepalive.min_interval, Duration::from_secs(60));
    }
}
