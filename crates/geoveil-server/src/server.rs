//! Encryption server implementation

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use geoveil_core::Pipeline;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::routes::create_router;
use crate::state::AppState;

/// Polygon encryption server
pub struct GeoveilServer {
    state: AppState,
    addr: SocketAddr,
}

impl GeoveilServer {
    pub fn new(state: AppState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    /// Bind and serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        let router = create_router(self.state);

        tracing::info!(%local, "Starting geoveil server");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server state for testing
    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Builder for GeoveilServer
pub struct ServerBuilder {
    pipeline: Arc<Pipeline>,
    config: ServerConfig,
}

impl ServerBuilder {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: ServerConfig::default(),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.config.addr = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.addr.set_port(port);
        self
    }

    pub fn build(self) -> Result<GeoveilServer> {
        let mut state = AppState::new(self.pipeline, &self.config)?;

        if self.config.metrics {
            state = state.with_prometheus(crate::metrics::init_prometheus_recorder()?);
        }
        if !self.config.auth.is_enabled() {
            tracing::warn!("authentication is disabled; every caller may encrypt polygons");
        }

        Ok(GeoveilServer::new(state, self.config.addr))
    }
}
