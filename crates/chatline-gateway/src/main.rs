//! chatline gateway binary.
//!
//! - Config: strict YAML from `$CHATLINE_CONFIG` (default `chatline.yaml`)
//! - Logging: `RUST_LOG` if set, otherwise `log.level` from config
//! - Routes: `/messages/listen` (WS), `/messages`, `/healthz`, `/metrics`
//! - Graceful shutdown on Ctrl-C / SIGTERM

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use chatline_core::error::{ChatError, Result};
use chatline_gateway::{app_state::AppState, config, obs, router};

#[tokio::main]
async fn main() -> ExitCode {
    let path = config::config_path();
    let loaded = config::load_from_file(&path);

    let level = loaded.as_ref().map(|c| c.log.level.as_str()).unwrap_or("info");
    init_tracing(level);

    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gateway failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt().with_env_filter(filter).init();
}

async fn run(cfg: config::GatewayConfig) -> Result<()> {
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| ChatError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}")))?;
    let reporter_every = cfg
        .reporter
        .enabled
        .then(|| Duration::from_millis(cfg.reporter.interval_ms));

    let state = AppState::new(cfg);
    let reporter = reporter_every.map(|every| obs::reporter::spawn_connection_reporter(state.registry(), every));
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ChatError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "chatline gateway started");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ChatError::Internal(format!("server failed: {e}")));

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    tracing::info!("shut down");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
}
