//! ZelloLink gateway daemon.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use zellolink_bridge_core::TxMode;
use zellolink_gateway::fne::{NET_PROTOCOL_SUBFUNC_DMR, NET_PROTOCOL_SUBFUNC_P25};
use zellolink_gateway::logging::{parse_log_level, setup_logging, LoggingConfig};
use zellolink_gateway::{GatewayConfig, GatewayHost, UdpFnePeer};

/// Zello to P25/DMR FNE audio gateway.
#[derive(Parser, Debug)]
#[command(name = "zellolink-gateway", version, about)]
struct Args {
    /// Path to the gateway configuration file
    #[arg(short, long, default_value = "configs/gateway.yml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = GatewayConfig::load(&args.config)?;

    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    setup_logging(LoggingConfig { level: parse_log_level(level)?, ..Default::default() })?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting zellolink gateway");

    let master: SocketAddr = format!("{}:{}", config.fne_address, config.fne_port)
        .parse()
        .context("resolving fne master address")?;
    let voice_subfunc = match config.tx_mode_enum() {
        TxMode::Dmr => NET_PROTOCOL_SUBFUNC_DMR,
        TxMode::P25 => NET_PROTOCOL_SUBFUNC_P25,
    };
    let (peer, peer_events) = UdpFnePeer::connect(master, config.peer_id, voice_subfunc)
        .await
        .context("starting fne peer")?;

    let host = GatewayHost::new(&config, peer, peer_events)?;
    host.run().await
}
