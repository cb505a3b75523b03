//! pixtrack gateway
//!
//! - Tracking pixel: /t.gif?e=...&src=...&k=...
//! - Stats:          /api/stats?src=...&k=...
//! - Config from PIXTRACK_CONFIG (default pixtrack.yaml), TRACKER_KEY overrides the key
//! - Graceful shutdown flips /readyz to draining

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use pixtrack_core::error::{Result, TrackerError};
use pixtrack_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.client_code().as_str(), error = %e, "pixtrack-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let explicit = std::env::var("PIXTRACK_CONFIG").ok();
    let mut cfg = config::load(explicit.as_deref())?;
    config::apply_env_overrides(&mut cfg, |name| std::env::var(name).ok());

    let listen = cfg.server.listen_addr()?;
    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(
        %listen,
        backend = state.store().backend(),
        access_control = state.access().is_enabled(),
        "pixtrack-gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| TrackerError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| TrackerError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    state.set_draining();
    tracing::info!("signal received, starting graceful shutdown");
}
