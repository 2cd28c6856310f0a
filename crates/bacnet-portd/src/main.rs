//! bacnet-portd daemon entry point.
//!
//! Parses the command line, initializes logging, loads the configuration
//! and runs the event loop until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bacnet_port::PortVariant;
use bacnet_portd::config::DEFAULT_CONFIG_PATH;
use bacnet_portd::{links, shutdown_signal, PortDaemon, PortdConfig};

#[derive(Parser, Debug)]
#[command(name = "bacnet-portd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Datalink port to start with (bip, bip6, mstp); overrides the config file
    #[arg(short = 'p', long)]
    port: Option<PortVariant>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

/// Initialize tracing/logging.
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = PortdConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(variant) = args.port {
        config.port.variant = variant;
    }

    info!("Compiled-in datalink ports: {:?}", links::compiled_variants());
    info!(
        "Selected port: {} ({}), task interval {}ms",
        config.port.variant,
        config.port.variant.description(),
        config.port.task_interval_ms
    );

    let mut daemon = PortDaemon::new(config)?.with_config_path(&args.config);

    // start() logs the failure; the link stays down until a SIGHUP retries.
    if daemon.start().is_err() {
        warn!("Continuing with datalink port {} down", daemon.dispatcher().selected());
    }

    daemon.run_until(shutdown_signal()).await?;

    if let Err(e) = daemon.shutdown() {
        warn!("Datalink port teardown failed: {}", e);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("bacnet-portd: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!("--- Starting bacnet-portd ---");

    match run(args).await {
        Ok(()) => {
            info!("bacnet-portd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("bacnet-portd error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
