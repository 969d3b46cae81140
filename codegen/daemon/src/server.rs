//! SSE server
//!
//! Binds the push transport router to a TCP listener and runs it until the
//! shutdown future resolves. On shutdown the active channel is closed first,
//! otherwise an open event stream would keep graceful shutdown waiting.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use codegen_core::transport::{router, PushState, SSE_PATH};
use codegen_core::McpServer;

/// The push transport daemon
pub struct SseServer {
    listen_addr: SocketAddr,
    state: PushState,
}

impl SseServer {
    /// Create a server for `mcp`; `capacity` bounds each channel's queues
    pub fn new(mcp: McpServer, listen_addr: SocketAddr, capacity: usize) -> Self {
        Self {
            listen_addr,
            state: PushState::new(Arc::new(mcp), capacity),
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", self.listen_addr))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(addr = %addr, path = SSE_PATH, "Listening for SSE connections");

        let active = self.state.active().clone();
        let graceful = async move {
            shutdown.await;
            if let Some(channel) = active.close() {
                info!(session = %channel.session_id(), "Closing active push channel");
            }
        };

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(graceful)
            .await
            .context("SSE server failed")?;

        info!("SSE server stopped");
        Ok(())
    }
}
