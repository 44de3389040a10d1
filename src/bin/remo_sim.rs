//! Remo Device Simulator
//!
//! Serves the local API like a real device so `remo-local` can be tried
//! without hardware. Emitted signals are kept and returned by the next
//! fetch; until then fetch gets the firmware's truncated placeholder.
//!
//! Usage: cargo run --bin remo-sim -- [--bind 127.0.0.1:8080] [--preload FILE]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use remo_local::sim::{DeviceSim, Mode};
use remo_local::IrSignal;

#[derive(Parser)]
#[command(name = "remo-sim")]
#[command(about = "Simulated Remo device serving the local API")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Signal record to report before anything is emitted
    #[arg(short, long)]
    preload: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let sim = DeviceSim::bind(&cli.bind, Mode::Device).await?;

    if let Some(path) = cli.preload {
        let raw = std::fs::read(&path).with_context(|| format!("failed to read {:?}", path))?;
        let signal = IrSignal::decode(&raw)
            .with_context(|| format!("invalid signal in {:?}", path))?
            .ok_or_else(|| anyhow::anyhow!("incomplete signal record in {:?}", path))?;
        info!("Preloaded {}", signal);
        sim.receive(signal);
    }

    info!("Simulating device at http://{}/messages", sim.local_addr());
    info!("Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    Ok(())
}
