//! # Helix Node
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment, then flags)
//! 2. Initialize telemetry
//! 3. Lock the data directory and open the block store, recovering it if
//!    the previous run was interrupted
//! 4. Start the subsystems and scheduled tasks
//! 5. Wait for Ctrl+C, then stop gracefully

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use node_runtime::container::StorageBackend;
use node_runtime::{Collaborators, Node, NodeConfig};
use node_telemetry::init_telemetry;

/// Helix blockchain node.
#[derive(Debug, Parser)]
#[command(name = "helix-node", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Data directory (overrides config and HX_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Storage backend: file or rocksdb
    #[arg(long)]
    backend: Option<StorageBackend>,

    /// Do not save or restore store checkpoints
    #[arg(long)]
    no_checkpoint: bool,

    /// Log level filter
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, config: &mut NodeConfig) {
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = dir.clone();
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        if self.no_checkpoint {
            config.storage.checkpointing = false;
        }
        if let Some(level) = &self.log_level {
            config.telemetry.log_level = level.clone();
        }
        if self.json_logs {
            config.telemetry.json_logs = true;
        }
    }
}

/// Load configuration from file, environment and flags.
fn load_config(cli: &Cli) -> Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid HX_* environment variable")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let _telemetry = init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Helix Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let (collaborators, _peers) = Collaborators::standalone();
    let node = Node::start(config, collaborators).context("Failed to start node")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    node.stop_all().await.context("Shutdown failed")?;
    Ok(())
}
