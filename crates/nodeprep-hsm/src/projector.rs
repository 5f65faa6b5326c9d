//! Turning an HSM descriptor into pod volumes, containers and environment.

use std::path::Path;

use tracing::{debug, info};

use crate::descriptor::{HsmDescriptor, MountSpec};
use crate::error::HsmError;
use crate::pod::{
    Container, EmptyDirVolumeSource, EnvVar, KeyToPath, LocalObjectReference, PodSpec,
    SecretVolumeSource, SecurityContext, Volume, VolumeMount, VolumeSource,
};

/// Shared in-memory volume used for the client library and daemon handshake.
pub const SHARED_VOLUME: &str = "shared";
/// Where helper containers mount the shared volume.
pub const SHARED_PATH: &str = "/shared";
/// Sub-directory of the shared volume holding the copied library.
pub const LIBRARY_SUBDIR: &str = "hsm";
/// Where the main container sees the copied library.
pub const LIBRARY_MOUNT_PATH: &str = "/hsm/lib";
/// Written by the daemon once it is ready to serve the main container.
pub const DAEMON_SENTINEL: &str = "/shared/daemon-launched";
/// Environment variable pointing the PKCS11 proxy library at its endpoint.
pub const PROXY_SOCKET_ENV: &str = "PKCS11_PROXY_SOCKET";

pub const LIBRARY_INIT_CONTAINER: &str = "hsm-client";
pub const DAEMON_CONTAINER: &str = "hsm-daemon";

/// How the node reaches the HSM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HsmMode {
    /// Through a PKCS11 proxy at `endpoint` (e.g. `tcp://hsm-proxy:2345`).
    Proxy { endpoint: String },
    /// Through the vendor library copied into the pod.
    Native,
}

impl HsmMode {
    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy { .. })
    }
}

/// Shell prefix that blocks until the daemon has written its sentinel file.
///
/// There is no timeout; a daemon that never starts is caught by the pod's
/// liveness probe.
pub fn daemon_barrier() -> String {
    format!(
        "while [ ! -f {} ]; do echo 'Waiting for HSM daemon to launch...'; sleep 1; done;",
        DAEMON_SENTINEL
    )
}

/// Rewrite a container command so it waits for the daemon first.
pub fn wrap_with_daemon_barrier(command: &[String], args: &[String]) -> Vec<String> {
    let original = command
        .iter()
        .chain(args)
        .map(|word| shell_quote(word))
        .collect::<Vec<_>>()
        .join(" ");
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("{} exec {}", daemon_barrier(), original),
    ]
}

fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Projects one validated descriptor onto node pods.
#[derive(Debug, Clone)]
pub struct HsmProjector {
    descriptor: HsmDescriptor,
    mode: HsmMode,
}

impl HsmProjector {
    /// Create a projector, rejecting descriptors with missing fields.
    pub fn new(descriptor: HsmDescriptor, mode: HsmMode) -> Result<Self, HsmError> {
        descriptor.validate(!mode.is_proxy())?;
        Ok(Self { descriptor, mode })
    }

    /// Load the descriptor file and create a projector.
    pub fn from_file(path: &Path, mode: HsmMode) -> Result<Self, HsmError> {
        Self::new(HsmDescriptor::from_file(path)?, mode)
    }

    pub fn descriptor(&self) -> &HsmDescriptor {
        &self.descriptor
    }

    pub fn mode(&self) -> &HsmMode {
        &self.mode
    }

    /// Volumes for every mount not backed by a caller-provided PVC.
    pub fn volumes(&self) -> Vec<Volume> {
        self.projected_mounts().map(mount_volume).collect()
    }

    /// Mounts matching [`HsmProjector::volumes`].
    pub fn volume_mounts(&self) -> Vec<VolumeMount> {
        self.projected_mounts()
            .map(|mount| {
                VolumeMount::new(&mount.name, &mount.mount_path).with_sub_path(&mount.sub_path)
            })
            .collect()
    }

    fn projected_mounts(&self) -> impl Iterator<Item = &MountSpec> {
        self.descriptor.mount_paths.iter().filter(|m| !m.use_pvc)
    }

    /// The library's pull secret, or an empty reference.
    pub fn build_pull_secret(&self) -> LocalObjectReference {
        LocalObjectReference {
            name: self
                .descriptor
                .library
                .auth
                .as_ref()
                .map(|auth| auth.image_pull_secret.clone())
                .unwrap_or_default(),
        }
    }

    /// Where the main container loads the client library from.
    ///
    /// `None` in proxy mode, where the node uses the proxy library instead.
    pub fn library_path(&self) -> Option<String> {
        if self.mode.is_proxy() {
            return None;
        }
        let file_name = Path::new(&self.descriptor.library.file_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(format!("{}/{}", LIBRARY_MOUNT_PATH, file_name))
    }

    /// Init container copying the client library onto the shared volume.
    pub fn library_init_container(&self) -> Option<Container> {
        if self.mode.is_proxy() {
            return None;
        }

        let source = &self.descriptor.library.file_path;
        let target_dir = format!("{}/{}", SHARED_PATH, LIBRARY_SUBDIR);
        let script = format!(
            "mkdir -p {dir} && echo 'Copying {src} to {dir}' && cp -r {src} {dir}/",
            dir = shell_quote(&target_dir),
            src = shell_quote(source),
        );

        let mut container = Container::new(LIBRARY_INIT_CONTAINER, &self.descriptor.library.image)
            .with_command(["sh", "-c", script.as_str()]);
        container.volume_mounts = vec![VolumeMount::new(SHARED_VOLUME, SHARED_PATH)];
        container.security_context = Some(SecurityContext {
            run_as_user: Some(0),
            run_as_non_root: Some(false),
            privileged: Some(false),
            allow_privilege_escalation: Some(false),
        });
        Some(container)
    }

    /// The privileged daemon sidecar, if the descriptor declares one.
    pub fn daemon_container(&self) -> Option<Container> {
        let daemon = self.descriptor.daemon.as_ref()?;
        let overrides = daemon.security_overrides.clone().unwrap_or_default();

        let mut container = Container::new(DAEMON_CONTAINER, &daemon.image);
        container.env = daemon.envs.clone();
        container.security_context = Some(SecurityContext {
            run_as_user: Some(0),
            run_as_non_root: Some(false),
            privileged: Some(overrides.privileged.unwrap_or(true)),
            allow_privilege_escalation: Some(overrides.allow_privilege_escalation.unwrap_or(true)),
        });
        container.resources = daemon.resources.clone();

        container.volume_mounts = vec![VolumeMount::new(SHARED_VOLUME, SHARED_PATH)];
        container.volume_mounts.extend(self.volume_mounts());
        if let Some(pvc) = self.descriptor.pvc_mount() {
            container.volume_mounts.push(pvc_volume_mount(pvc));
        }
        Some(container)
    }

    /// The mount a caller-provided PVC must be attached at, if any.
    pub fn pvc_mount(&self) -> Option<VolumeMount> {
        self.descriptor.pvc_mount().map(pvc_volume_mount)
    }

    /// Proxy nodes without a daemon need neither the library copy nor the
    /// descriptor's mounts.
    fn uses_pod_volumes(&self) -> bool {
        !self.mode.is_proxy() || self.descriptor.daemon.is_some()
    }

    /// Apply the whole projection to `pod`, treating `main` as the node
    /// container.
    pub fn apply(&self, pod: &mut PodSpec, main: &str) -> Result<(), HsmError> {
        let mut volumes = Vec::new();
        if self.uses_pod_volumes() {
            volumes = self.volumes();
            volumes.push(Volume {
                name: SHARED_VOLUME.to_string(),
                source: VolumeSource::EmptyDir(EmptyDirVolumeSource {
                    medium: "Memory".to_string(),
                }),
            });
        }

        let init = self.library_init_container();
        let daemon = self.daemon_container();
        let library_mount = VolumeMount::new(SHARED_VOLUME, LIBRARY_MOUNT_PATH)
            .with_sub_path(LIBRARY_SUBDIR);

        let container = pod
            .container_mut(main)
            .ok_or_else(|| HsmError::ContainerNotFound(main.to_string()))?;
        if daemon.is_some() && container.command.is_empty() {
            return Err(HsmError::NoCommand(main.to_string()));
        }

        match &self.mode {
            HsmMode::Proxy { endpoint } => {
                container.set_env(EnvVar::new(PROXY_SOCKET_ENV, endpoint));
            }
            HsmMode::Native => {
                for var in &self.descriptor.envs {
                    container.set_env(var.clone());
                }
                container.volume_mounts.extend(self.volume_mounts());
                container.volume_mounts.push(library_mount);
            }
        }

        if daemon.is_some() {
            container.command = wrap_with_daemon_barrier(&container.command, &container.args);
            container.args.clear();
            // the sentinel lives on the shared volume root
            container
                .volume_mounts
                .push(VolumeMount::new(SHARED_VOLUME, SHARED_PATH));
            if let Some(pvc) = self.pvc_mount() {
                container.volume_mounts.push(pvc);
            }
        }

        pod.volumes.extend(volumes);
        pod.add_pull_secret(self.build_pull_secret());
        if let Some(auth) = self.descriptor.daemon.as_ref().and_then(|d| d.auth.as_ref()) {
            pod.add_pull_secret(LocalObjectReference {
                name: auth.image_pull_secret.clone(),
            });
        }
        if let Some(init) = init {
            pod.init_containers.push(init);
        }
        if let Some(daemon) = daemon {
            debug!(image = %daemon.image, "HSM daemon sidecar added");
            pod.containers.push(daemon);
        }

        info!(
            container = %main,
            proxy = self.mode.is_proxy(),
            daemon = self.descriptor.daemon.is_some(),
            "HSM settings projected"
        );
        Ok(())
    }
}

fn mount_volume(mount: &MountSpec) -> Volume {
    let source = match &mount.volume_source {
        Some(source) => source.clone(),
        None => VolumeSource::Secret(SecretVolumeSource {
            secret_name: mount.secret_ref.clone(),
            items: mount
                .key_path_mappings
                .iter()
                .map(|kp| KeyToPath {
                    key: kp.key.clone(),
                    path: kp.path.clone(),
                })
                .collect(),
        }),
    };
    Volume {
        name: mount.name.clone(),
        source,
    }
}

fn pvc_volume_mount(mount: &MountSpec) -> VolumeMount {
    VolumeMount::new(&mount.name, &mount.mount_path).with_sub_path(&mount.sub_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("peer"), "peer");
        assert_eq!(shell_quote("/usr/bin/peer"), "/usr/bin/peer");
        assert_eq!(shell_quote("node start"), "'node start'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_barrier_wraps_command_and_args() {
        let wrapped = wrap_with_daemon_barrier(
            &["peer".to_string()],
            &["node".to_string(), "start".to_string()],
        );
        assert_eq!(wrapped[0], "sh");
        assert_eq!(wrapped[1], "-c");
        assert_eq!(
            wrapped[2],
            "while [ ! -f /shared/daemon-launched ]; do echo 'Waiting for HSM daemon to launch...'; sleep 1; done; exec peer node start"
        );
    }

    #[test]
    fn test_pvc_mount_helper() {
        let mount = MountSpec {
            name: "tokens".to_string(),
            mount_path: "/tokens".to_string(),
            use_pvc: true,
            sub_path: "hsm".to_string(),
            ..Default::default()
        };
        assert_eq!(
            pvc_volume_mount(&mount),
            VolumeMount::new("tokens", "/tokens").with_sub_path("hsm")
        );
    }
}
