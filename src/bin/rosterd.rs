use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use roster::config;
use roster::icon::IconCache;
use roster::ipc::{self, server::Server};
use roster::presence::Aggregator;
use roster::source::{self, WorkspaceWatcher};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting roster daemon");

    let config = config::load();
    let socket_path = config.socket.resolve_path();

    if let Some(pid) = ipc::read_pid() {
        if ipc::process_alive(pid) {
            tracing::error!("rosterd is already running (pid {})", pid);
            std::process::exit(1);
        }
    }

    let icons = Arc::new(IconCache::new(config.icons.cache_dir()));

    let aggregator = Aggregator::new(
        source::platform_workspace(),
        source::platform_window_server(),
        icons,
        &config.presence,
    );

    let (events_tx, events_rx) = mpsc::channel(64);
    let shutdown = CancellationToken::new();

    // Bind before consuming the event feed; without the rendezvous point
    // there is nothing to serve.
    let server = match Server::bind(socket_path.clone(), aggregator, events_rx, shutdown.clone()) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", socket_path.display(), e);
            std::process::exit(1);
        }
    };

    ipc::write_pid();

    let watcher = WorkspaceWatcher::new(
        source::platform_workspace(),
        Duration::from_millis(config.presence.poll_interval_ms),
    );
    tokio::spawn(watcher.run(events_tx));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        signal_shutdown.cancel();
    });

    server.run().await;

    ipc::remove_pid();
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = ctrl_c.await;
        }
    }
}
