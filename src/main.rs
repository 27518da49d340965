use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use carlot::config::Config;
use carlot::engine::Engine;
use carlot::observability::{CONNECTIONS_ACTIVE, CONNECTIONS_REJECTED_TOTAL, CONNECTIONS_TOTAL};
use carlot::{seed, tls, wire};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    carlot::observability::init(config.metrics_port)?;
    let tls_acceptor = tls::acceptor_from_config(&config)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let engine = Arc::new(Engine::open(&config.wal_path())?);
    if let Some(seed_file) = &config.seed_file {
        seed::seed_if_empty(&engine, seed_file).await?;
    }

    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!(
        addr = %config.listen_addr(),
        data_dir = %config.data_dir.display(),
        max_connections = config.max_connections,
        tls = tls_acceptor.is_some(),
        metrics_port = ?config.metrics_port,
        "carlot listening"
    );

    let semaphore = Arc::new(Semaphore::new(config.max_connections));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let (socket, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!("accept error: {e}");
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
        };

        let Ok(permit) = semaphore.clone().try_acquire_owned() else {
            warn!("connection limit reached, rejecting {peer}");
            metrics::counter!(CONNECTIONS_REJECTED_TOTAL).increment(1);
            continue;
        };

        tracing::debug!("connection from {peer}");
        metrics::counter!(CONNECTIONS_TOTAL).increment(1);
        metrics::gauge!(CONNECTIONS_ACTIVE).increment(1.0);
        let engine = engine.clone();
        let password = config.password.clone();
        let tls = tls_acceptor.clone();

        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = wire::process_connection(socket, engine, password, tls).await {
                tracing::error!("connection error from {peer}: {e}");
            }
            metrics::gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
        });
    }

    drain(&semaphore, config.max_connections).await;
    info!("carlot stopped");
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => warn!("cannot register SIGTERM handler: {e}"),
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}

/// Wait until every connection permit is back, or give up after `DRAIN_TIMEOUT`.
async fn drain(semaphore: &Semaphore, max_connections: usize) {
    let all_returned = async {
        // Every in-flight connection holds one permit until it closes.
        let permits = u32::try_from(max_connections).unwrap_or(u32::MAX);
        let _ = semaphore.acquire_many(permits).await;
    };
    match tokio::time::timeout(DRAIN_TIMEOUT, all_returned).await {
        Ok(()) => info!("all connections drained"),
        Err(_) => {
            let open = max_connections.saturating_sub(semaphore.available_permits());
            warn!("drain timeout, {open} connections still open");
        }
    }
}
