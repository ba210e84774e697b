//! Launcher for the per-channel UDP-to-TCP forwarding workers.
//!
//! Each worker is an independent child process with no shared state; they
//! are started fire-and-forget and jointly awaited.

use anyhow::{anyhow, Result};
use clap::Parser;
use futures::future::join_all;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Channel name, UDP ingest port, TCP egress port
const CHANNEL_PORTS: &[(&str, u16, u16)] = &[
    ("abc", 50001, 60001),
    ("nbc", 50002, 60002),
    ("fox", 50003, 60003),
    ("mntv", 50004, 60004),
    ("cw", 50005, 60005),
    ("cbs", 50006, 60006),
    ("pbs", 50007, 60007),
    ("pbs2", 50008, 60008),
];

/// Worker binary, relative to the deployment root
const UDP_TO_TCP: &str = "forwarder/udp_to_tcp";

fn channel_ports(channel: &str) -> Option<(u16, u16)> {
    CHANNEL_PORTS
        .iter()
        .find(|(name, _, _)| *name == channel)
        .map(|(_, udp, tcp)| (*udp, *tcp))
}

#[derive(Parser)]
#[command(about = "Forward the UDP feeds of the given channels over TCP")]
struct Args {
    /// Channels to forward
    #[arg(required = true)]
    channel: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("forwarder=info".parse()?);
    fmt().with_env_filter(env_filter).init();

    let args = Args::parse();

    let exe = std::env::current_exe()?;
    let src_dir = exe
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| anyhow!("Cannot determine the deployment root directory"))?;
    let udp_to_tcp = src_dir.join(UDP_TO_TCP);

    let mut children = Vec::new();
    for channel in &args.channel {
        let (udp_port, tcp_port) =
            channel_ports(channel).ok_or_else(|| anyhow!("Unknown channel: {}", channel))?;

        info!("{} {} {}", udp_to_tcp.display(), udp_port, tcp_port);
        let child = Command::new(&udp_to_tcp)
            .arg(udp_port.to_string())
            .arg(tcp_port.to_string())
            .spawn()
            .map_err(|e| anyhow!("Failed to start forwarder for {}: {}", channel, e))?;
        children.push((channel.clone(), child));
    }

    // No ordering or coordination among the workers; just wait for all
    let waits = join_all(
        children
            .iter_mut()
            .map(|(_, child)| child.wait()),
    )
    .await;

    for ((channel, _), status) in children.iter().zip(waits) {
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("Forwarder for {} exited with {}", channel, status),
            Err(e) => warn!("Failed to wait for forwarder {}: {}", channel, e),
        }
    }

    Ok(())
}
