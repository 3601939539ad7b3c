//! TrustMesh Node - Main Binary
//!
//! Runs a trust engine with:
//! - Signed risk edges gossiped between members
//! - Periodic betrayal detection and belief propagation
//! - Sled-backed persistence of edges and reputation
//! - Prometheus metrics

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use trustmesh_core::{NodeId, SystemClock};
use trustmesh_crypto::keys::{load_keypair, save_keypair};
use trustmesh_crypto::NodeKeypair;
use trustmesh_detection::CycleEvidence;
use trustmesh_graph::SledRepository;
use trustmesh_node::{ChannelNetwork, EngineConfig, EngineService, ServiceConfig, TrustEngine};

/// TrustMesh Node CLI
#[derive(Parser)]
#[command(name = "trustmesh-node")]
#[command(about = "TrustMesh Node - decentralized risk graph with betrayal detection")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/trustmesh/node.toml", env = "TRUSTMESH_CONFIG")]
    config: PathBuf,

    /// Node name (overrides config)
    #[arg(long, env = "TRUSTMESH_NODE_ID")]
    node_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the node (default)
    Run,

    /// Decode hex-encoded cycle evidence and print it as JSON
    Evidence {
        /// Evidence bytes as hex
        hex: String,
    },

    /// Generate a new keypair
    Keygen {
        /// Output directory for keys
        #[arg(short, long, default_value = "./keys")]
        output: PathBuf,
    },

    /// Show node version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},trustmesh_node=debug", log_level).into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cli.config, cli.node_id).await,
        Command::Evidence { hex } => print_evidence(&hex),
        Command::Keygen { output } => generate_keypair(&output),
        Command::Version => {
            println!("TrustMesh Node v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run(config_path: PathBuf, node_id: Option<String>) -> Result<()> {
    info!("Starting TrustMesh Node v{}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load(&config_path)?;
    info!("Loaded configuration from {:?}", config_path);
    if let Some(node_id) = node_id {
        config.node.id = node_id;
    }
    config.validate()?;

    let keypair = load_or_generate_keypair(&config)?;
    let repository = SledRepository::open_with_config(config.sled_config())
        .with_context(|| format!("Failed to open storage at {:?}", config.storage_path()))?;

    let engine = TrustEngine::new(&config, keypair, repository, Arc::new(SystemClock))?;
    info!(name = %config.node.id, did = %engine.did(), local = %engine.local(), "Trust engine initialized");

    // Other members are reached through the network layer; standalone nodes
    // only gossip with themselves.
    let network = ChannelNetwork::new();
    let transport = Arc::new(network.join(engine.local()));
    let (handle, mut service) = EngineService::spawn(engine, transport, ServiceConfig::from(&config));

    tokio::select! {
        result = &mut service => {
            match result {
                Ok(Ok(())) => info!("Engine service exited"),
                Ok(Err(e)) => {
                    error!("Engine error: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Engine task failed: {}", e);
                    return Err(e.into());
                }
            }
            return Ok(());
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal (SIGTERM)");
        }
    }

    let persisted = handle.shutdown().await?;
    info!(persisted, "Reputation records persisted");
    service.await??;

    info!("Node stopped gracefully");
    Ok(())
}

fn load_or_generate_keypair(config: &EngineConfig) -> Result<NodeKeypair> {
    let path = config.key_path();
    if path.exists() {
        return load_keypair(&path, NodeId(0))
            .with_context(|| format!("Failed to load keypair from {:?}", path));
    }
    if !config.node.auto_generate_keys {
        anyhow::bail!("Key file {:?} not found and auto_generate_keys is off", path);
    }

    warn!("No key file at {:?}, generating a new keypair", path);
    let keypair = NodeKeypair::generate(NodeId(0));
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let written = save_keypair(&keypair, dir)?;
    if written != path {
        warn!("Keypair written to {:?}; point node.key_path there", written);
    }
    Ok(keypair)
}

fn print_evidence(encoded: &str) -> Result<()> {
    let bytes = hex::decode(encoded.trim()).context("Evidence is not valid hex")?;
    let evidence = CycleEvidence::decode(&bytes)?;
    let summary = serde_json::json!({
        "members": evidence.members(),
        "length": evidence.len(),
        "total_risk": evidence.total_risk(),
        "digest": hex::encode(evidence.digest()),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Generate a new keypair
fn generate_keypair(output_dir: &Path) -> Result<()> {
    info!("Generating Ed25519 keypair...");
    let keypair = NodeKeypair::generate(NodeId(0));
    let secret_path = save_keypair(&keypair, output_dir)?;

    info!("Keypair generated:");
    info!("  Secret key: {:?}", secret_path);
    info!("  DID:        {}", keypair.did());
    Ok(())
}

/// Cross-platform shutdown signal handling
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    // On non-Unix systems, only Ctrl+C is supported
    std::future::pending::<()>().await
}
