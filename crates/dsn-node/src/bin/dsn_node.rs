//! The `dsn-node` binary: loads a TOML config describing this node's
//! identity and prime specialization, brings up structured logging and the
//! Prometheus metrics endpoint, and runs a node that joins the network
//! through an initial peer (when one is configured) or starts as a
//! bootstrap node.

use clap::Parser;
use dsn_node::Node;
use dsn_types::config::DsnConfig;
use dsn_types::field::SemanticDomain;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dsn-node", about = "Runs a single Distributed Sentience Network node")]
struct Cli {
    /// Path to this node's TOML configuration file.
    #[arg(long, default_value = "dsn-node.toml")]
    config: PathBuf,
    /// Address the Prometheus `/metrics` endpoint listens on.
    #[arg(long, default_value = "0.0.0.0:9090")]
    metrics_addr: SocketAddr,
}

#[derive(Debug, Deserialize)]
struct NodeFile {
    node_id: String,
    channel_id: String,
    #[serde(default = "default_domain")]
    semantic_domain: SemanticDomain,
    #[serde(default)]
    prime_domain: Vec<u64>,
    #[serde(default)]
    network: NetworkConfig,
}

fn default_domain() -> SemanticDomain {
    SemanticDomain::Cognitive
}

#[derive(Debug, Default, Deserialize)]
struct NetworkConfig {
    #[serde(flatten, default)]
    dsn: DsnConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dsn_telemetry::init::init_tracing()?;
    dsn_telemetry::prometheus::install()?;

    let cli = Cli::parse();
    let raw = std::fs::read_to_string(&cli.config)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", cli.config.display()))?;
    let file: NodeFile = toml::from_str(&raw)?;
    file.network.dsn.validate().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(node_id = %file.node_id, channel_id = %file.channel_id, "starting dsn-node");

    let node = Node::new(
        file.node_id,
        file.channel_id,
        file.semantic_domain,
        file.prime_domain,
        file.network.dsn,
    );
    node.mark_online();

    tokio::spawn(dsn_telemetry::http::run_server(cli.metrics_addr));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    node.offline();
    Ok(())
}
