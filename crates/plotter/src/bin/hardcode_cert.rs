//! Upsert a TLS certificate and private key into the config store.
//!
//! ```bash
//! hardcode-cert cert.pem key.pem
//! ```
//!
//! Prints `Success` when the material is stored; exits nonzero otherwise.
//! The gateway only brokers this material to the TLS frontend.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use plotter_auth::{HardcodedTlsCertificate, StoreNamespace};
use plotter_config::EnvOverrides;
use plotter_store::ConfigStore;

/// Upsert a hardcoded TLS certificate/key pair into the config store
#[derive(Parser, Debug)]
#[command(name = "hardcode-cert", version)]
struct Cli {
    /// PEM-encoded certificate file
    cert_file: std::path::PathBuf,

    /// PEM-encoded private key file
    key_file: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::new("info"))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => {
            println!("Success");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    use anyhow::Context;

    let cert = std::fs::read(&cli.cert_file)
        .with_context(|| format!("could not read {}", cli.cert_file.display()))?;
    let key = std::fs::read(&cli.key_file)
        .with_context(|| format!("could not read {}", cli.key_file.display()))?;

    let env = EnvOverrides::from_env().context("invalid environment")?;
    let ns = StoreNamespace::new(env.config_prefix);
    let store: Arc<dyn ConfigStore> =
        Arc::new(mr_plotter::store::open_store(env.store_endpoint.as_deref())?);

    HardcodedTlsCertificate { cert, key }
        .upsert(&store, &ns)
        .await
        .context("could not update hardcoded TLS certificate")?;

    Ok(())
}
