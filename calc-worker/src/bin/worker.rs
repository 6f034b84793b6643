//! Worker process entry point: spawns `COMPUTING_POWER` concurrent
//! polling loops against `SERVER_URL`.

use calc_shared::config::AppConfig;
use calc_worker::{OrchestratorClient, Worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    calc_shared::logging::init();

    let config = AppConfig::load()?;
    tracing::info!(
        server_url = %config.server_url,
        computing_power = config.computing_power,
        "starting calc-worker"
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let client = OrchestratorClient::new(config.server_url.clone());

    let mut handles = Vec::with_capacity(config.computing_power);
    for id in 0..config.computing_power {
        let worker = Worker::new(id, client.clone());
        let rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(worker.run(rx)));
    }

    shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping workers");
    let _ = shutdown_tx.send(());

    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal() {
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
}
