//! Upsert session encryption/MAC keys into the config store.
//!
//! ```bash
//! set-session-keys encrypt.key mac.key
//! ```
//!
//! Prints `Success` when the keys are stored; exits nonzero otherwise.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use plotter_auth::{SessionKeys, StoreNamespace, TokenCrypto};
use plotter_config::EnvOverrides;
use plotter_store::ConfigStore;

/// Upsert session encryption/MAC keys into the config store
#[derive(Parser, Debug)]
#[command(name = "set-session-keys", version)]
struct Cli {
    /// File holding the encryption key (16, 24, or 32 bytes)
    encrypt_key_file: std::path::PathBuf,

    /// File holding the MAC key (at least 16 bytes)
    mac_key_file: std::path::PathBuf,
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

    let encrypt_key = std::fs::read(&cli.encrypt_key_file)
        .with_context(|| format!("could not read {}", cli.encrypt_key_file.display()))?;
    let mac_key = std::fs::read(&cli.mac_key_file)
        .with_context(|| format!("could not read {}", cli.mac_key_file.display()))?;

    // Reject unusable keys before touching the store.
    TokenCrypto::new(&encrypt_key, &mac_key).context("invalid session keys")?;

    let env = EnvOverrides::from_env().context("invalid environment")?;
    let ns = StoreNamespace::new(env.config_prefix);
    let store: Arc<dyn ConfigStore> =
        Arc::new(mr_plotter::store::open_store(env.store_endpoint.as_deref())?);

    SessionKeys {
        encrypt_key,
        mac_key,
    }
    .upsert(&store, &ns)
    .await
    .context("could not update session keys")?;

    Ok(())
}
