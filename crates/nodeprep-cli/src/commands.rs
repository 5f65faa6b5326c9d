//! Subcommand implementations.

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use nodeprep_config::orderer;
use nodeprep_config::peer::{v1, v2, v25};
use nodeprep_config::{merge_files, NodeConfig, OrdererVersion, PeerVersion};
use nodeprep_core::{Category, CryptoBundle, NodeRef, NodeRole};
use nodeprep_crypto::{verify_cert_ou, FileStore, MaterialStore, Provisioner};
use nodeprep_hsm::{HsmMode, HsmProjector, PodSpec};

use crate::config::Config;
use crate::request::ProvisionRequest;
use crate::NodeKind;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub struct MergeArgs {
    pub kind: NodeKind,
    pub version: String,
    pub baseline: PathBuf,
    pub overrides: PathBuf,
    pub output: PathBuf,
    pub hsm_proxy: bool,
}

pub fn merge_config(config: &Config, args: MergeArgs) -> CliResult<()> {
    let certs = match args.kind {
        NodeKind::Peer => match PeerVersion::from_fabric_version(&args.version)? {
            PeerVersion::V1 => merge_and_persist::<v1::Core>(&args, &config.cert_dir)?,
            PeerVersion::V2 => merge_and_persist::<v2::Core>(&args, &config.cert_dir)?,
            PeerVersion::V25 => merge_and_persist::<v25::Core>(&args, &config.cert_dir)?,
        },
        NodeKind::Orderer => match OrdererVersion::from_fabric_version(&args.version)? {
            OrdererVersion::V1 => merge_and_persist::<orderer::v1::Orderer>(&args, &config.cert_dir)?,
            OrdererVersion::V2 => merge_and_persist::<orderer::v2::Orderer>(&args, &config.cert_dir)?,
        },
    };

    println!("Configuration written to {}", args.output.display());
    if certs > 0 {
        println!(
            "{} orderer CA certificate(s) written to {}",
            certs,
            config.cert_dir.display()
        );
    }
    Ok(())
}

fn merge_and_persist<C: NodeConfig>(args: &MergeArgs, cert_dir: &Path) -> CliResult<usize> {
    let merged: C = merge_files(&args.baseline, &args.overrides, &args.output, args.hsm_proxy)?;
    let written = match merged.delivery_client() {
        Some(client) => client.write_address_override_certs(cert_dir)?,
        None => 0,
    };
    Ok(written)
}

pub fn project_hsm(
    descriptor: &Path,
    pod: &Path,
    container: &str,
    proxy_endpoint: Option<String>,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let mode = match proxy_endpoint {
        Some(endpoint) => HsmMode::Proxy { endpoint },
        None => HsmMode::Native,
    };
    let projector = HsmProjector::from_file(descriptor, mode)?;

    let text = std::fs::read_to_string(pod)
        .map_err(|e| format!("failed to read pod spec '{}': {}", pod.display(), e))?;
    let mut spec: PodSpec = serde_yaml::from_str(&text)?;
    projector.apply(&mut spec, container)?;

    let yaml = serde_yaml::to_string(&spec)?;
    match output {
        Some(path) => {
            std::fs::write(&path, yaml)
                .map_err(|e| format!("failed to write '{}': {}", path.display(), e))?;
            info!(path = %path.display(), "Pod spec written");
        }
        None => print!("{}", yaml),
    }
    if let Some(library) = projector.library_path() {
        info!(library = %library, "HSM library path for the node configuration");
    }
    Ok(())
}

pub fn verify_ou(cert: &Path, role: &str) -> CliResult<()> {
    let role: NodeRole = role.parse()?;
    let bytes = std::fs::read(cert)
        .map_err(|e| format!("failed to read certificate '{}': {}", cert.display(), e))?;

    verify_cert_ou(&CryptoBundle::default().with_sign_cert(bytes), role.ou())?;
    println!("Certificate OU matches role '{}'", role);
    Ok(())
}

fn material_store(config: &Config) -> MaterialStore<FileStore> {
    MaterialStore::new(FileStore::new(&config.store_dir))
}

pub async fn provision(
    config: &Config,
    node: &str,
    request: &Path,
    role: &str,
    rotate: bool,
) -> CliResult<()> {
    let role: NodeRole = role.parse()?;
    let node = NodeRef::new(node, &config.namespace);
    let orchestrator = ProvisionRequest::from_file(request)?.orchestrator()?;

    let provisioner = Provisioner::new(material_store(config));
    let response = if rotate {
        provisioner.rotate(&node, role, &orchestrator).await?
    } else {
        provisioner.provision(&node, role, &orchestrator).await?
    };

    for (category, _) in response.iter() {
        println!("Stored {} material for {}/{}", category, node.namespace, node.name);
    }
    Ok(())
}

pub async fn get_crypto(config: &Config, node: &str) -> CliResult<()> {
    let node = NodeRef::new(node, &config.namespace);
    let store = material_store(config);

    let mut summary = serde_json::Map::new();
    for category in Category::ALL {
        let bundle = store.get_crypto_from_secrets(category, &node).await?;
        if bundle.is_empty() {
            continue;
        }
        summary.insert(category.to_string(), bundle_summary(&bundle));
    }

    if summary.is_empty() {
        println!("No crypto material stored for {}/{}", node.namespace, node.name);
    } else {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn bundle_summary(bundle: &CryptoBundle) -> serde_json::Value {
    json!({
        "caCerts": bundle.ca_certs.len(),
        "intermediateCerts": bundle.intermediate_certs.len(),
        "adminCerts": bundle.admin_certs.len(),
        "signCert": String::from_utf8_lossy(&bundle.sign_cert),
        "privateKey": !bundle.private_key.is_empty(),
    })
}

pub async fn delete_crypto(config: &Config, node: &str) -> CliResult<()> {
    let node = NodeRef::new(node, &config.namespace);
    material_store(config).delete_all_secrets(&node).await?;
    println!("Deleted crypto material for {}/{}", node.namespace, node.name);
    Ok(())
}
