use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use remo_local::config::Config;
use remo_local::{ErrorKind, IrSignal, LocalClient};

#[derive(Parser)]
#[command(name = "remo-local")]
#[command(about = "Read and send IR signals through a Remo's local API")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Device address (host[:port]), overrides the config file
    #[arg(short, long)]
    address: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the newest received IR signal as JSON
    Fetch,
    /// Transmit an IR signal read from FILE (or stdin)
    Emit {
        /// JSON signal record; `-` or omitted reads stdin
        file: Option<PathBuf>,
    },
}

/// Process exit codes, one per outcome kind
mod exit {
    pub const NO_SIGNAL: u8 = 2;
    pub const DEVICE: u8 = 3;
    pub const TRANSPORT: u8 = 4;
    pub const CODEC: u8 = 5;
    pub const OTHER: u8 = 1;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let (config, load_err) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize tracing/logging (stderr, stdout carries signal JSON)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    if let Some(e) = load_err {
        warn!("{}; using default configuration", e);
    }

    let address = cli.address.unwrap_or_else(|| config.device.address.clone());

    match run(cli.command, &address, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(command: Command, address: &str, config: &Config) -> anyhow::Result<u8> {
    let client = LocalClient::from_config(address, &config.http)?;

    match command {
        Command::Fetch => match client.fetch_newest_signal().await? {
            Some(signal) => {
                info!("Fetched {} from {}", signal, address);
                let json = serde_json::to_string(&signal)?;
                println!("{}", json);
                Ok(0)
            }
            None => {
                warn!("No signal recorded on {}", address);
                Ok(exit::NO_SIGNAL)
            }
        },
        Command::Emit { file } => {
            let input = read_input(file.as_deref())?;
            let signal = match IrSignal::decode(&input) {
                Ok(Some(signal)) => signal,
                Ok(None) => anyhow::bail!("signal input ended before the record was complete"),
                Err(e) => return Err(remo_local::Error::Decode(e)).context("invalid signal input"),
            };

            client.emit_signal(&signal).await?;
            info!("Emitted {} via {}", signal, address);
            Ok(0)
        }
    }
}

fn read_input(file: Option<&std::path::Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) if path != std::path::Path::new("-") => {
            std::fs::read(path).with_context(|| format!("failed to read {:?}", path))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read signal from stdin")?;
            Ok(buf)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<remo_local::Error>().map(|e| e.kind()) {
        Some(ErrorKind::Device) => exit::DEVICE,
        Some(ErrorKind::Transport) => exit::TRANSPORT,
        Some(ErrorKind::Decode) | Some(ErrorKind::Encode) => exit::CODEC,
        None => exit::OTHER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<IrSignal>("nope").unwrap_err()
    }

    #[test]
    fn test_device_error_exit_code() {
        let err = anyhow::Error::from(remo_local::Error::Device {
            status: 400,
            status_text: "Bad Request".to_string(),
        });
        assert_eq!(exit_code(&err), exit::DEVICE);
    }

    #[test]
    fn test_codec_error_exit_codes() {
        let err = anyhow::Error::from(remo_local::Error::Decode(json_error()));
        assert_eq!(exit_code(&err), exit::CODEC);

        let err = anyhow::Error::from(remo_local::Error::Encode(json_error()));
        assert_eq!(exit_code(&err), exit::CODEC);
    }

    #[test]
    fn test_context_keeps_exit_code() {
        let result: Result<(), remo_local::Error> = Err(remo_local::Error::Decode(json_error()));
        let err = result.context("invalid signal input").unwrap_err();
        assert_eq!(exit_code(&err), exit::CODEC);
    }

    #[tokio::test]
    async fn test_transport_error_exit_code() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LocalClient::new(addr.to_string());
        let err = client.fetch_newest_signal().await.unwrap_err();
        assert_eq!(exit_code(&anyhow::Error::from(err)), exit::TRANSPORT);
    }

    #[test]
    fn test_other_errors_exit_code() {
        let err = anyhow::anyhow!("Failed to parse config file: expected `]`");
        assert_eq!(exit_code(&err), exit::OTHER);
    }

    #[tokio::test]
    async fn test_fetch_without_signal_exits_no_signal() {
        let sim = remo_local::sim::DeviceSim::start(remo_local::sim::Mode::Device)
            .await
            .unwrap();
        let code = run(Command::Fetch, &sim.address(), &Config::default())
            .await
            .unwrap();
        assert_eq!(code, exit::NO_SIGNAL);

        sim.receive(IrSignal::new(38, vec![100, 200]));
        let code = run(Command::Fetch, &sim.address(), &Config::default())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
