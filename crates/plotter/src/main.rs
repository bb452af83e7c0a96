//! Mr. Plotter - multi-resolution plotting gateway
//!
//! # Usage
//!
//! ```bash
//! # Run the gateway
//! mr-plotter serve
//! mr-plotter serve --config plotter.toml
//!
//! # Print the version and exit
//! mr-plotter --version
//! ```
//!
//! Deployment-level settings come from the environment: `CONFIG_PREFIX`
//! selects the config-store namespace, `PATH_SEPARATOR` overrides the
//! collection separator, and `CONFIG_STORE_ENDPOINT` selects the store.

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use plotter_config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Multi-resolution time-series plotting gateway
#[derive(Parser, Debug)]
#[command(name = "mr-plotter")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway
    Serve(cmd::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(mut args)) => {
            if args.config.is_none() && cli.config.is_some() {
                args.config = cli.config;
            }
            let log_level = resolve_log_level(cli.log_level.as_deref(), args.config.as_deref());
            init_logging(&log_level)?;
            cmd::serve::run(args).await
        }
        // No subcommand = serve with defaults
        None => {
            let args = cmd::serve::ServeArgs { config: cli.config };
            let log_level = resolve_log_level(cli.log_level.as_deref(), args.config.as_deref());
            init_logging(&log_level)?;
            cmd::serve::run(args).await
        }
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config_path: Option<&std::path::Path>) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }

    if let Some(path) = config_path {
        if path.exists() {
            if let Ok(config) = Config::from_file(path) {
                return config.log.level.as_str().to_string();
            }
        }
    }

    "info".to_string()
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
