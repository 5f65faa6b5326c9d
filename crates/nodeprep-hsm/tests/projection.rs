//! Projecting descriptors onto a peer pod.

use nodeprep_hsm::pod::{SecretVolumeSource, SecurityContext};
use nodeprep_hsm::projector::{DAEMON_CONTAINER, PROXY_SOCKET_ENV};
use nodeprep_hsm::{
    Container, EnvVar, HsmDescriptor, HsmError, HsmMode, HsmProjector, PodSpec, VolumeMount,
    VolumeSource,
};

const NATIVE: &str = r#"
type: hsm
version: v1
library:
  filepath: /usr/lib/softhsm/libsofthsm2.so
  image: registry.example.com/softhsm-client:2.6
  auth:
    imagePullSecret: regcred
envs:
  - name: SOFTHSM2_CONF
    value: /etc/tokens/softhsm2.conf
mountpaths:
  - name: softhsmconf
    secret: softhsm-conf
    mountpath: /etc/tokens
    paths:
      - key: softhsm2.conf
        path: softhsm2.conf
  - name: tokens
    mountpath: /var/lib/softhsm/tokens
    usePVC: true
"#;

fn with_daemon(privileged: Option<bool>) -> HsmDescriptor {
    let mut descriptor = HsmDescriptor::from_yaml(NATIVE).unwrap();
    let mut daemon = nodeprep_hsm::Daemon {
        image: "registry.example.com/hsm-daemon:1.0".to_string(),
        envs: vec![EnvVar::new("DAEMON_LOG", "debug")],
        ..Default::default()
    };
    if privileged.is_some() {
        daemon.security_overrides = Some(nodeprep_hsm::SecurityOverrides {
            privileged,
            allow_privilege_escalation: None,
        });
    }
    descriptor.daemon = Some(daemon);
    descriptor
}

fn peer_pod() -> PodSpec {
    PodSpec {
        containers: vec![Container::new("peer", "hyperledger/fabric-peer:2.5.4")
            .with_command(["peer", "node", "start"])],
        ..Default::default()
    }
}

#[test]
fn test_volumes_skip_pvc_mounts() {
    let projector =
        HsmProjector::new(HsmDescriptor::from_yaml(NATIVE).unwrap(), HsmMode::Native).unwrap();

    let volumes = projector.volumes();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].name, "softhsmconf");
    match &volumes[0].source {
        VolumeSource::Secret(SecretVolumeSource { secret_name, items }) => {
            assert_eq!(secret_name, "softhsm-conf");
            assert_eq!(items[0].key, "softhsm2.conf");
        }
        other => panic!("unexpected source {other:?}"),
    }

    assert_eq!(
        projector.volume_mounts(),
        vec![VolumeMount::new("softhsmconf", "/etc/tokens")]
    );
    assert_eq!(
        projector.pvc_mount(),
        Some(VolumeMount::new("tokens", "/var/lib/softhsm/tokens"))
    );
}

#[test]
fn test_pull_secret() {
    let mut descriptor = HsmDescriptor::from_yaml(NATIVE).unwrap();
    let projector = HsmProjector::new(descriptor.clone(), HsmMode::Native).unwrap();
    assert_eq!(projector.build_pull_secret().name, "regcred");

    descriptor.library.auth = None;
    let projector = HsmProjector::new(descriptor, HsmMode::Native).unwrap();
    assert_eq!(projector.build_pull_secret().name, "");
}

#[test]
fn test_native_without_daemon() {
    let projector =
        HsmProjector::new(HsmDescriptor::from_yaml(NATIVE).unwrap(), HsmMode::Native).unwrap();
    let mut pod = peer_pod();
    projector.apply(&mut pod, "peer").unwrap();

    assert_eq!(pod.init_containers.len(), 1);
    let init = &pod.init_containers[0];
    assert_eq!(init.name, "hsm-client");
    assert_eq!(init.image, "registry.example.com/softhsm-client:2.6");
    assert!(init.command[2].contains("cp -r /usr/lib/softhsm/libsofthsm2.so /shared/hsm/"));

    let peer = &pod.containers[0];
    assert_eq!(peer.command, vec!["peer", "node", "start"]);
    assert!(peer
        .env
        .contains(&EnvVar::new("SOFTHSM2_CONF", "/etc/tokens/softhsm2.conf")));
    assert!(peer
        .volume_mounts
        .contains(&VolumeMount::new("shared", "/hsm/lib").with_sub_path("hsm")));
    assert_eq!(
        projector.library_path().as_deref(),
        Some("/hsm/lib/libsofthsm2.so")
    );

    assert_eq!(pod.containers.len(), 1);
    assert!(pod.volumes.iter().any(|v| v.name == "shared"));
    assert_eq!(pod.image_pull_secrets[0].name, "regcred");
}

#[test]
fn test_proxy_mode() {
    let mut descriptor = HsmDescriptor::from_yaml(NATIVE).unwrap();
    descriptor.library.image.clear();
    let projector = HsmProjector::new(
        descriptor,
        HsmMode::Proxy {
            endpoint: "tcp://hsm-proxy:2345".to_string(),
        },
    )
    .unwrap();

    let mut pod = peer_pod();
    projector.apply(&mut pod, "peer").unwrap();

    assert!(pod.init_containers.is_empty());
    assert!(projector.library_path().is_none());
    let peer = &pod.containers[0];
    assert_eq!(
        peer.env,
        vec![EnvVar::new(PROXY_SOCKET_ENV, "tcp://hsm-proxy:2345")]
    );
    assert!(peer.volume_mounts.is_empty());
    assert!(!pod.volumes.iter().any(|v| v.name == "shared"));
}

#[test]
fn test_daemon_sidecar_and_barrier() {
    let projector = HsmProjector::new(with_daemon(None), HsmMode::Native).unwrap();
    let mut pod = peer_pod();
    projector.apply(&mut pod, "peer").unwrap();

    assert_eq!(pod.containers.len(), 2);
    let daemon = pod
        .containers
        .iter()
        .find(|c| c.name == DAEMON_CONTAINER)
        .unwrap();
    assert_eq!(
        daemon.security_context,
        Some(SecurityContext {
            run_as_user: Some(0),
            run_as_non_root: Some(false),
            privileged: Some(true),
            allow_privilege_escalation: Some(true),
        })
    );
    assert!(daemon
        .volume_mounts
        .contains(&VolumeMount::new("shared", "/shared")));
    assert!(daemon
        .volume_mounts
        .contains(&VolumeMount::new("tokens", "/var/lib/softhsm/tokens")));

    let peer = &pod.containers[0];
    assert_eq!(peer.command[..2], ["sh".to_string(), "-c".to_string()]);
    assert!(peer.command[2].starts_with("while [ ! -f /shared/daemon-launched ]"));
    assert!(peer.command[2].ends_with("exec peer node start"));
    assert!(peer
        .volume_mounts
        .contains(&VolumeMount::new("tokens", "/var/lib/softhsm/tokens")));
    assert!(peer
        .volume_mounts
        .contains(&VolumeMount::new("shared", "/shared")));
}

#[test]
fn test_daemon_privilege_override() {
    let projector = HsmProjector::new(with_daemon(Some(false)), HsmMode::Native).unwrap();
    let daemon = projector.daemon_container().unwrap();
    let security = daemon.security_context.unwrap();
    assert_eq!(security.privileged, Some(false));
    assert_eq!(security.allow_privilege_escalation, Some(true));
}

#[test]
fn test_apply_errors() {
    let projector = HsmProjector::new(with_daemon(None), HsmMode::Native).unwrap();

    let mut pod = peer_pod();
    let err = projector.apply(&mut pod, "orderer").unwrap_err();
    assert!(matches!(err, HsmError::ContainerNotFound(_)));
    assert_eq!(pod, peer_pod());

    let original = PodSpec {
        containers: vec![Container::new("peer", "hyperledger/fabric-peer:2.5.4")],
        ..Default::default()
    };
    let mut pod = original.clone();
    let err = projector.apply(&mut pod, "peer").unwrap_err();
    assert_eq!(
        err.to_string(),
        "container 'peer' has no command to wait on the HSM daemon"
    );
    // a failed projection leaves the pod untouched
    assert_eq!(pod, original);
}

#[test]
fn test_missing_fields_rejected() {
    let mut descriptor = with_daemon(None);
    descriptor.daemon.as_mut().unwrap().image.clear();
    let err = HsmProjector::new(descriptor, HsmMode::Native).unwrap_err();
    assert_eq!(
        err.to_string(),
        "HSM descriptor is missing required field 'daemon.image'"
    );
}
