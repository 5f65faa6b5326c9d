//! Orderer configurations (`orderer.yaml`).

pub mod v1;
pub mod v2;

use serde::{Deserialize, Serialize};

use crate::bccsp::Bccsp;
use crate::merge_struct;
use crate::Duration;

/// `General` keys common to every orderer release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct General {
    pub listen_address: String,
    pub listen_port: u16,
    #[serde(rename = "TLS")]
    pub tls: OrdererTls,
    pub cluster: Cluster,
    pub keepalive: Keepalive,
    #[serde(rename = "LocalMSPDir")]
    pub local_msp_dir: String,
    #[serde(rename = "LocalMSPID")]
    pub local_msp_id: String,
    pub profile: Profile,
    #[serde(rename = "BCCSP", skip_serializing_if = "Option::is_none")]
    pub bccsp: Option<Bccsp>,
    pub authentication: Authentication,
}
merge_struct!(General {
    listen_address,
    listen_port,
    tls,
    cluster,
    keepalive,
    local_msp_dir,
    local_msp_id,
    profile,
    bccsp,
    authentication
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OrdererTls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub private_key: String,
    pub certificate: String,
    #[serde(rename = "RootCAs")]
    pub root_cas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_auth_required: Option<bool>,
    #[serde(rename = "ClientRootCAs")]
    pub client_root_cas: Vec<String>,
}
merge_struct!(OrdererTls {
    enabled,
    private_key,
    certificate,
    root_cas,
    client_auth_required,
    client_root_cas
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Cluster {
    pub send_buffer_size: i32,
    pub client_certificate: String,
    pub client_private_key: String,
    pub listen_port: u16,
    pub listen_address: String,
    pub server_certificate: String,
    pub server_private_key: String,
    pub dial_timeout: Duration,
    #[serde(rename = "RPCTimeout")]
    pub rpc_timeout: Duration,
    pub replication_buffer_size: i64,
    pub replication_pull_timeout: Duration,
    pub replication_retry_timeout: Duration,
}
merge_struct!(Cluster {
    send_buffer_size,
    client_certificate,
    client_private_key,
    listen_port,
    listen_address,
    server_certificate,
    server_private_key,
    dial_timeout,
    rpc_timeout,
    replication_buffer_size,
    replication_pull_timeout,
    replication_retry_timeout
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Keepalive {
    pub server_min_interval: Duration,
    pub server_interval: Duration,
    pub server_timeout: Duration,
}
merge_struct!(Keepalive {
    server_min_interval,
    server_interval,
    server_timeout
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub address: String,
}
merge_struct!(Profile { enabled, address });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Authentication {
    pub time_window: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_expiration_checks: Option<bool>,
}
merge_struct!(Authentication {
    time_window,
    no_expiration_checks
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FileLedger {
    pub location: String,
    pub prefix: String,
}
merge_struct!(FileLedger { location, prefix });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TraceDirs {
    pub broadcast_trace_dir: String,
    pub deliver_trace_dir: String,
}
merge_struct!(TraceDirs {
    broadcast_trace_dir,
    deliver_trace_dir
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consensus {
    #[serde(rename = "WALDir")]
    pub wal_dir: String,
    #[serde(rename = "SnapDir")]
    pub snap_dir: String,
}
merge_struct!(Consensus { wal_dir, snap_dir });

/// Operations and admin endpoints share this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Endpoint {
    pub listen_address: String,
    #[serde(rename = "TLS")]
    pub tls: EndpointTls,
}
merge_struct!(Endpoint {
    listen_address,
    tls
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EndpointTls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub certificate: String,
    pub private_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_auth_required: Option<bool>,
    #[serde(rename = "ClientRootCAs")]
    pub client_root_cas: Vec<String>,
}
merge_struct!(EndpointTls {
    enabled,
    certificate,
    private_key,
    client_auth_required,
    client_root_cas
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Metrics {
    pub provider: String,
    pub statsd: Statsd,
}
merge_struct!(Metrics { provider, statsd });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
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
