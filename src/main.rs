use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use streamgate::config::{Args, Config};
use streamgate::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from(Args::parse());

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).init();

    info!(
        target: "streamgate",
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.listen,
        storage = ?config.storage,
        "streamgate starting"
    );

    let store = config.storage.open();
    store.init().context("failed to open store")?;

    let state = AppState::new(store.clone(), config.directory()?);
    let admin = state.users.config().admin_username.clone();
    let users = state.users.clone();
    match tokio::task::spawn_blocking(move || users.create_default_admin_user()).await? {
        Ok(Some(password)) => {
            warn!(target: "streamgate", user = %admin, password = %password, "created default admin user; change this password after first login")
        }
        Ok(None) => info!(target: "streamgate", user = %admin, "admin user already present"),
        Err(e) => return Err(e).context("failed to bootstrap admin user"),
    }

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(target: "streamgate", addr = %config.listen, backend = store.backend_name(), "listening");

    let result = axum::serve(listener, build_router(state)).with_graceful_shutdown(shutdown_signal()).await;

    if let Err(e) = store.close() {
        error!(target: "streamgate", error = %e, "failed to close store");
    }
    info!(target: "streamgate", "shutdown complete");
    result.context("server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(target: "streamgate", error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(target: "streamgate", error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target: "streamgate", "received Ctrl+C, shutting down"),
        _ = terminate => info!(target: "streamgate", "received SIGTERM, shutting down"),
    }
}
