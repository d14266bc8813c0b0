use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::state::RelayState;
use super::websocket;

/// Handle to a running relay: the actual bound address plus graceful stop.
pub struct RelayHandle {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RelayHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Signal shutdown and wait for the serve loop to wind down.
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        self.task.await.context("Relay server task panicked")??;
        Ok(())
    }
}

/// Bind `addr` and serve the relay on it until the handle is stopped.
///
/// Binding is the one fatal startup error (e.g. the address is already in
/// use); it is reported immediately with context, never retried. Passing
/// port 0 binds an ephemeral port, which `RelayHandle::addr` reports.
pub async fn start(state: Arc<RelayState>, addr: &str) -> Result<RelayHandle> {
    let app = Router::new()
        .route("/", get(websocket::ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind relay listener on {addr}"))?;
    let addr = listener
        .local_addr()
        .context("Failed to read bound address")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    Ok(RelayHandle {
        addr,
        shutdown_tx,
        task,
    })
}
