//! Gordon Audio Player (gordon-ap) - Main entry point
//!
//! Opens the output device, loads any files named on the command line and
//! reads player commands from stdin until `exit` or Ctrl+C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gordon_ap::audio::AudioOutput;
use gordon_ap::playback::Deck;
use gordon_ap::{repl, Session};
use gordon_common::{PlayerConfig, SampleRate};
use tokio::io::BufReader;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for gordon-ap
#[derive(Parser, Debug)]
#[command(name = "gordon-ap")]
#[command(about = "Command-driven audio player with looping, markers and export")]
#[command(version)]
struct Args {
    /// Files to load and play together at startup
    files: Vec<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "GORDON_CONFIG")]
    config: Option<PathBuf>,

    /// Output device name (overrides the config file)
    #[arg(short, long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PlayerConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    if args.device.is_some() {
        config.device = args.device.clone();
    }

    // Logs go to stderr so they do not interleave with command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "gordon_ap={level},gordon_common={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting gordon-ap v{} [{}] built {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let sample_rate = SampleRate::new(config.sample_rate);
    let lock = Deck::shared();

    let mut output = AudioOutput::open(config.device.as_deref(), sample_rate, config.buffer_frames())
        .context("Failed to open audio output")?;
    if output.sample_rate() != sample_rate.hz() {
        warn!(
            "Device runs at {} Hz, session rate is {}",
            output.sample_rate(),
            sample_rate
        );
    }
    output
        .start(lock.clone())
        .context("Failed to start audio output")?;
    info!("Playing on {}", output.device_name());

    let mut session = Session::new(config, lock);

    if !args.files.is_empty() {
        match session.load(&args.files).await {
            Ok(count) => info!("Loaded {} file(s)", count),
            Err(e) => error!("{}", e),
        }
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = repl::run(&mut session, stdin, stdout) => {
            result.context("Command loop failed")?;
        }
        _ = shutdown_signal() => {}
    }

    output.stop().context("Failed to stop audio output")?;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed that branch never resolves and the
/// command loop keeps running.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
