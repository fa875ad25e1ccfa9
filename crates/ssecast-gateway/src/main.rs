//! ssecast gateway
//!
//! - Event stream: GET /events?client_id=...
//! - Static page for every other path
//! - Demo ticker publishing the time every couple of seconds

use tracing_subscriber::{fmt, EnvFilter};

use ssecast_gateway::{app_state, config, producer, router};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = match config::load_or_default() {
        Ok(cfg) => cfg,
        Err(e) => fatal("config load failed", &e),
    };
    let listen = match cfg.gateway.listen_addr() {
        Ok(addr) => addr,
        Err(e) => fatal("invalid listen address", &e),
    };
    let ticker = cfg.ticker.enabled.then(|| cfg.ticker.interval());

    let state = match app_state::AppState::new(cfg) {
        Ok(state) => state,
        Err(e) => fatal("startup failed", &e),
    };
    if let Some(every) = ticker {
        producer::spawn_ticker(state.broker(), every);
    }
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "ssecast-gateway starting");
    let listener = match tokio::net::TcpListener::bind(listen).await {
        Ok(l) => l,
        Err(e) => fatal("failed to bind", &e),
    };

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            state.begin_shutdown();
        })
        .await;
    if let Err(e) = served {
        fatal("server failed", &e);
    }
}

fn fatal(what: &str, err: &dyn std::fmt::Display) -> ! {
    tracing::error!(error = %err, "{what}");
    std::process::exit(1);
}

async fn shutdown_signal() {
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
                tracing::error!(error = %e, "failed to install signal handler");
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
