//! Listener and serve loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::routes;

/// Merge server bound to a listening socket.
///
/// [`Server::run`] returns once [`Server::shutdown_handle`] is notified and
/// in-flight requests have completed.
pub struct Server {
    listener: TcpListener,
    app: Router,
    shutdown: Arc<Notify>,
}

impl Server {
    /// Bind the listener described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind))?;
        Ok(Self {
            listener,
            app: routes::app(config),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Address actually bound, useful with port 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("Listener has no local address")
    }

    /// Handle that stops [`Server::run`] when notified.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Serve requests until shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails.
    pub async fn run(self) -> Result<()> {
        let addr = self.listener.local_addr().ok();
        info!(addr = ?addr, "listening");

        let shutdown = self.shutdown;
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(async move {
                shutdown.notified().await;
                debug!("serve loop received shutdown signal");
            })
            .await
            .context("Server error")?;

        info!("server stopped");
        Ok(())
    }
}
