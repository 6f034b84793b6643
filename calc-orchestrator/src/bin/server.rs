//! Orchestrator entry point: loads configuration, connects a store
//! backend, and serves the HTTP API with graceful shutdown on
//! SIGINT/SIGTERM.

use std::sync::Arc;

use calc_orchestrator::http::{self, AppState};
use calc_orchestrator::scheduler::Scheduler;
use calc_orchestrator::store::Store;
use calc_orchestrator::store::memory::InMemoryStore;
use calc_orchestrator::store::postgres::PostgresStore;
use calc_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    calc_shared::logging::init();

    let config = Arc::new(AppConfig::load()?);
    tracing::info!(port = config.port, "starting calc-orchestrator");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("connecting to postgres store");
            Arc::new(PostgresStore::connect(url).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (not for production)");
            Arc::new(InMemoryStore::new())
        }
    };

    let scheduler = Scheduler::new(store.clone(), config.clone());
    let state = AppState {
        scheduler,
        store,
        config: config.clone(),
    };
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.shutdown_timeout_secs))
        .await?;

    Ok(())
}

async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(timeout_secs, "shutdown signal received, draining connections");
}
