//! The `serve` command: HTTP API plus the deletion reconciler, with
//! graceful shutdown on Ctrl-C.

use std::net::SocketAddr;

use tokio::sync::watch;
use tracing::info;

use crate::settings::Settings;
use crate::wiring;

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;

    // ── Deletion reconciler ────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let events = orch.watch_deleted().await?;
    let reconciler_handle = tokio::spawn(orch.reconciler().run(events, shutdown_rx));

    // ── API server ─────────────────────────────────────────────

    let router = warden_api::build_router(orch, settings.cors);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!(%addr, cors = settings.cors, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = reconciler_handle.await;
    info!("warden server stopped");
    Ok(())
}
