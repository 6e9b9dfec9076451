//! colorbook-server – entry point.
//!
//! Startup order:
//! 1. Read configuration from the environment.
//! 2. Initialise tracing (pretty locally, newline-JSON when configured).
//! 3. Check the provider credential and build shared state.
//! 4. Serve the Axum router until Ctrl-C / SIGTERM.

mod config;
mod error;
mod middleware;
mod provider;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ──────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Logging ────────────────────────────────────────────────────────────
    init_tracing(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "colorbook-server starting");

    // ── 3. Provider client + shared state ──────────────────────────────────────
    // The credential is deployment configuration; refuse to start without it
    // rather than forwarding unauthenticated requests upstream.
    if cfg.provider_api_key.is_empty() {
        anyhow::bail!("KIE_API_KEY is not set; the provider credential is required");
    }
    let state = Arc::new(AppState::new(cfg.clone()));
    info!(
        base_url = %cfg.provider_base_url,
        model = %cfg.provider_model,
        "provider client ready"
    );

    // ── 4. HTTP server ────────────────────────────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("colorbook-server stopped");
    Ok(())
}

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter so operators can
/// raise verbosity without touching the deployment configuration.
fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .unwrap_or_else(|e| {
            eprintln!(
                "WARN: COLORBOOK_LOG='{}' is not a valid tracing filter ({e}); \
                 falling back to 'info'",
                cfg.log_level
            );
            EnvFilter::new("info")
        });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to install CTRL+C signal handler");
            }
        }
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
