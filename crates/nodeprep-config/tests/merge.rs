//! Baseline load -> override merge -> write, end to end.

use base64::{engine::general_purpose::STANDARD, Engine};

use nodeprep_config::peer::{v1, v2, v25};
use nodeprep_config::{merge_files, ConfigError, Duration, NodeConfig};

const BASELINE: &str = r#"
peer:
  id: peer0
  listenAddress: 0.0.0.0:7051
  keepalive:
    minInterval: 60s
  gossip:
    bootstrap: 127.0.0.1:7051
    useLeaderElection: true
  BCCSP:
    Default: SW
    SW:
      Hash: SHA2
      Security: 256
  deliveryclient:
    connTimeout: 3s
chaincode:
  startuptimeout: 300s
"#;

const ORDERER_CA: &[u8] = b"-----BEGIN CERTIFICATE-----\nMIIBorderer\n-----END CERTIFICATE-----\n";

fn hsm_overrides() -> String {
    format!(
        r#"
peer:
  keepalive:
    minInterval: 13s
  BCCSP:
    Default: PKCS11
  deliveryclient:
    addressOverrides:
      - from: orderer0.example.com:7050
        to: orderer0.internal:7050
        caCertsFile: {}
"#,
        STANDARD.encode(ORDERER_CA)
    )
}

#[test]
fn test_min_interval_override_and_zero() {
    let mut core = v2::Core::from_yaml(BASELINE).unwrap();
    core.merge_with(&v2::Core::default(), false).unwrap();
    assert_eq!(
        core.peer.base.keepalive.min_interval,
        Duration::from_secs(60)
    );

    let overrides = v2::Core::from_yaml("peer:\n  keepalive:\n    minInterval: 13s\n").unwrap();
    core.merge_with(&overrides, false).unwrap();
    assert_eq!(
        core.peer.base.keepalive.min_interval,
        Duration::from_secs(13)
    );
    // untouched baseline values survive
    assert_eq!(core.peer.base.id, "peer0");
    assert_eq!(core.peer.base.gossip.use_leader_election, Some(true));
}

#[test]
fn test_pkcs11_proxy_defaults_after_merge() {
    let mut core = v25::Core::from_yaml(BASELINE).unwrap();
    let overrides = v25::Core::from_yaml(&hsm_overrides()).unwrap();
    core.merge_with(&overrides, true).unwrap();

    let bccsp = core.peer.base.bccsp.as_ref().unwrap();
    assert_eq!(bccsp.provider_name, "PKCS11");
    let opts = bccsp.pkcs11.as_ref().unwrap();
    assert_eq!(opts.library, "/usr/local/lib/libpkcs11-proxy.so");
    assert_eq!(opts.hash, "SHA2");
    assert_eq!(opts.security, 256);
    assert!(opts.software_verify);
}

#[test]
fn test_address_overrides_externalized() {
    let mut core = v1::Core::from_yaml(BASELINE).unwrap();
    let overrides = v1::Core::from_yaml(&hsm_overrides()).unwrap();
    core.merge_with(&overrides, false).unwrap();

    let client = &core.peer.deliveryclient;
    assert_eq!(client.conn_timeout, Duration::from_secs(3));
    assert_eq!(client.address_overrides.len(), 1);
    assert_eq!(
        client.address_overrides[0].ca_certs_file,
        "/orderer/certs/cert0.pem"
    );
    assert_eq!(client.address_overrides[0].to, "orderer0.internal:7050");
    assert_eq!(core.address_override_certs(), &[ORDERER_CA.to_vec()]);
}

#[test]
fn test_merge_is_idempotent() {
    let overrides = v2::Core::from_yaml(&hsm_overrides()).unwrap();

    let mut once = v2::Core::from_yaml(BASELINE).unwrap();
    once.merge_with(&overrides, true).unwrap();

    let mut twice = once.clone();
    twice.merge_with(&overrides, true).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.address_override_certs(), twice.address_override_certs());

    // a merge with nothing set also leaves it alone
    let mut thrice = twice.clone();
    thrice.merge_with(&v2::Core::default(), true).unwrap();
    assert_eq!(thrice, twice);
    assert_eq!(thrice.address_override_certs(), once.address_override_certs());
}

#[test]
fn test_bad_certificate_aborts_merge() {
    let mut core = v2::Core::from_yaml(BASELINE).unwrap();
    let overrides = v2::Core::from_yaml(
        "peer:\n  deliveryclient:\n    addressOverrides:\n      - from: a\n        to: b\n        caCertsFile: '%%%'\n",
    )
    .unwrap();
    let err = core.merge_with(&overrides, false).unwrap_err();
    assert!(matches!(err, ConfigError::AddressOverride { index: 0, .. }));
}

#[test]
fn test_merge_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = dir.path().join("core.yaml");
    let overrides = dir.path().join("overrides.yaml");
    let output = dir.path().join("out/core.yaml");
    std::fs::write(&baseline, BASELINE).unwrap();
    std::fs::write(&overrides, hsm_overrides()).unwrap();

    let merged: v2::Core = merge_files(&baseline, &overrides, &output, true).unwrap();
    let written = merged
        .peer
        .base
        .deliveryclient
        .write_address_override_certs(&dir.path().join("certs"))
        .unwrap();
    assert_eq!(written, 1);
    assert_eq!(
        std::fs::read(dir.path().join("certs/cert0.pem")).unwrap(),
        ORDERER_CA
    );

    let reloaded = v2::Core::read_from(&output).unwrap();
    assert_eq!(reloaded.peer.base.gossip.bootstrap, vec!["127.0.0.1:7051"]);
    assert_eq!(
        reloaded.peer.base.keepalive.min_interval,
        Duration::from_secs(13)
    );
    assert_eq!(
        reloaded.peer.base.deliveryclient.address_overrides[0].ca_certs_file,
        "/orderer/certs/cert0.pem"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&output).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn test_missing_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let err = v1::Core::read_from(&dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
