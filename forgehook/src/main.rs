//! forgehook service binary

use anyhow::Result;
use forgehook::{config::Config, handlers, observability, state::AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init()?;

    let config = Config::load()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config);
    let app = handlers::router(state);

    info!(service = forgehook::SERVICE_NAME, %addr, "starting");
    info!("webhook endpoint: POST /api/service");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM; in-flight requests drain before exit.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received terminate signal, shutting down"),
    }
}
