//! Gateway startup
//!
//! Wires the config store, TSDB driver, authenticator, permission cache,
//! and dispatchers together, spawns the background daemons, and serves the
//! router until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use plotter_auth::{SessionAuthenticator, StoreNamespace};
use plotter_config::{Config, EnvOverrides};
use plotter_dispatch::{spawn_task_count_logger, spawn_waiting_logger, Dispatcher};
use plotter_gateway::{build_router, AppState};
use plotter_permcache::{spawn_invalidation_daemon, PermissionChecker};
use plotter_store::ConfigStore;
use plotter_tsdb::{MemoryTsdb, TsdbClient};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    info!("starting Mr. Plotter version {}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("could not load config from {}", path.display()))?,
        None => Config::default(),
    };

    let env = EnvOverrides::from_env().context("invalid environment")?;
    let ns = StoreNamespace::new(env.config_prefix.clone());

    info!("opening config store");
    let store: Arc<dyn ConfigStore> = Arc::new(
        mr_plotter::store::open_store(env.store_endpoint.as_deref())
            .context("could not open config store")?,
    );

    // The driver trait is the seam for a production TSDB client; the
    // in-memory backend serves development and tests.
    let tsdb: Arc<dyn TsdbClient> = Arc::new(MemoryTsdb::new());
    warn!("no database configured; serving from the in-memory TSDB backend");

    let auth = Arc::new(
        SessionAuthenticator::bootstrap(
            Arc::clone(&store),
            ns.clone(),
            config.session.expiry_seconds,
        )
        .await
        .context("could not initialize session keys")?,
    );
    let _key_watch = auth.spawn_key_watch();

    let permissions = Arc::new(PermissionChecker::new(
        Arc::clone(&tsdb),
        Arc::clone(&store),
        ns,
        config.cache.max_cached_permissions,
    ));

    let shutdown = CancellationToken::new();
    let _invalidation = spawn_invalidation_daemon(
        Arc::clone(&store),
        Arc::clone(&permissions),
        shutdown.clone(),
    );

    let data = Arc::new(Dispatcher::new(
        Arc::clone(&tsdb),
        config.limits.max_data_requests,
        Duration::from_secs(config.limits.db_data_timeout_seconds),
        "data",
    ));
    let brackets = Arc::new(Dispatcher::new(
        Arc::clone(&tsdb),
        config.limits.max_bracket_requests,
        Duration::from_secs(config.limits.db_bracket_timeout_seconds),
        "bracket",
    ));

    let _waiting_log = spawn_waiting_logger(
        Arc::clone(&data),
        Arc::clone(&brackets),
        Duration::from_secs(config.instrument.waiting_log_interval_seconds),
    );
    let _task_log = spawn_task_count_logger(Duration::from_secs(
        config.instrument.task_log_interval_seconds,
    ));

    let state = AppState {
        data,
        brackets,
        auth,
        permissions,
        max_request_bytes: config.limits.max_request_bytes,
        path_separator: env.path_separator,
    };

    let app = build_router(state);

    let bind_addr = config.server.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(addr = %bind_addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    shutdown.cancel();
    info!("gateway stopped");
    Ok(())
}

/// Resolves on ctrl-c or external cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = cancel.cancelled() => {}
    }
}
