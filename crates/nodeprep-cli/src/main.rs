//! nodeprep CLI - prepares crypto material and configuration for ledger nodes.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod request;

use config::Config;

/// nodeprep - node crypto and configuration preparation
#[derive(Parser)]
#[command(name = "nodeprep")]
#[command(about = "Prepare crypto material and configuration for ledger nodes", long_about = None)]
struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, env = "NODEPREP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory of the file-backed material store
    #[arg(long, global = true, env = "NODEPREP_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Default namespace for stored material
    #[arg(short, long, global = true, env = "NODEPREP_NAMESPACE")]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum NodeKind {
    Peer,
    Orderer,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge configuration overrides onto a baseline and write the result
    #[command(name = "merge-config")]
    MergeConfig {
        /// Node type
        #[arg(long, value_enum)]
        kind: NodeKind,

        /// Fabric release, e.g. 2.5.4
        #[arg(long)]
        version: String,

        /// Baseline configuration file
        #[arg(long)]
        baseline: PathBuf,

        /// Override configuration file
        #[arg(long)]
        overrides: PathBuf,

        /// Where to write the merged configuration
        #[arg(short, long)]
        output: PathBuf,

        /// The node reaches its HSM through the PKCS11 proxy
        #[arg(long)]
        hsm_proxy: bool,

        /// Directory for externalized orderer CA certificates
        #[arg(long, env = "NODEPREP_CERT_DIR")]
        cert_dir: Option<PathBuf>,
    },

    /// Add HSM volumes, containers and environment to a pod spec
    #[command(name = "project-hsm")]
    ProjectHsm {
        /// HSM descriptor file
        #[arg(long)]
        descriptor: PathBuf,

        /// Pod spec file (YAML)
        #[arg(long)]
        pod: PathBuf,

        /// Name of the node container in the pod
        #[arg(long, default_value = "peer")]
        container: String,

        /// PKCS11 proxy endpoint; the library is copied into the pod when unset
        #[arg(long)]
        proxy_endpoint: Option<String>,

        /// Output file; stdout when unset
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that a certificate carries the OU of a node role
    #[command(name = "verify-ou")]
    VerifyOu {
        /// Certificate file (PEM or DER)
        #[arg(long)]
        cert: PathBuf,

        /// Node role: peer, orderer, client or admin
        #[arg(long)]
        role: String,
    },

    /// Obtain, verify and store a node's crypto material
    #[command(name = "provision")]
    Provision {
        /// Node name
        node: String,

        /// Provisioning request file
        #[arg(long)]
        request: PathBuf,

        /// Node role: peer, orderer, client or admin
        #[arg(long, default_value = "peer")]
        role: String,

        /// Replace existing material but keep admin certificates
        #[arg(long)]
        rotate: bool,
    },

    /// Show the stored crypto material of a node
    #[command(name = "get-crypto")]
    GetCrypto {
        /// Node name
        node: String,
    },

    /// Delete the stored crypto material of a node
    #[command(name = "delete-crypto")]
    DeleteCrypto {
        /// Node name
        node: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::default();
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = cli.store_dir {
        config.store_dir = dir;
    }
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    match cli.command {
        Commands::MergeConfig {
            kind,
            version,
            baseline,
            overrides,
            output,
            hsm_proxy,
            cert_dir,
        } => {
            if let Some(dir) = cert_dir {
                config.cert_dir = dir;
            }
            commands::merge_config(
                &config,
                commands::MergeArgs {
                    kind,
                    version,
                    baseline,
                    overrides,
                    output,
                    hsm_proxy,
                },
            )?;
        }
        Commands::ProjectHsm {
            descriptor,
            pod,
            container,
            proxy_endpoint,
            output,
        } => {
            commands::project_hsm(&descriptor, &pod, &container, proxy_endpoint, output)?;
        }
        Commands::VerifyOu { cert, role } => {
            commands::verify_ou(&cert, &role)?;
        }
        Commands::Provision {
            node,
            request,
            role,
            rotate,
        } => {
            commands::provision(&config, &node, &request, &role, rotate).await?;
        }
        Commands::GetCrypto { node } => {
            commands::get_crypto(&config, &node).await?;
        }
        Commands::DeleteCrypto { node } => {
            commands::delete_crypto(&config, &node).await?;
        }
    }

    Ok(())
}
