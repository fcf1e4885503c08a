use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swerve_zenoh_runtime::config::{CMD_TIMEOUT, LOOP_HZ, SwerveConfig};
use swerve_zenoh_runtime::runtime::{self, RuntimeOptions};

/// Swerve module runtime: chassis commands in, per-module steering and drive out
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON module configuration (defaults to the built-in four-module chassis)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control loop frequency in Hz
    #[arg(long, default_value_t = LOOP_HZ)]
    hz: u64,

    /// Stop the modules when no command arrives within this many milliseconds
    #[arg(long, default_value_t = CMD_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();
    if args.hz == 0 {
        eprintln!("Loop frequency must be at least 1 Hz");
        std::process::exit(2);
    }

    let config = match &args.config {
        Some(path) => match SwerveConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("No configuration file given, using built-in chassis");
            SwerveConfig::default()
        }
    };

    let options = RuntimeOptions {
        period: Duration::from_secs_f64(1.0 / args.hz as f64),
        cmd_timeout: Duration::from_millis(args.timeout_ms),
    };

    if let Err(e) = runtime::run(config, options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
