//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::EngineConfig;
use crate::engine::ImpactEngine;
use crate::error::{DaemonError, DaemonResult};
use tokio::net::TcpListener;

/// impactd server
pub struct Server {
    config: EngineConfig,
    engine: ImpactEngine,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: EngineConfig) -> DaemonResult<Self> {
        let engine = ImpactEngine::bootstrap(&config).await?;
        Ok(Self { config, engine })
    }

    pub fn engine(&self) -> &ImpactEngine {
        &self.engine
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let refresh = self.engine.start_background();
        let app = create_router(AppState::new(self.engine), self.config.server.enable_cors);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DaemonError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!(%addr, "impactd listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        if let Some(handle) = refresh {
            handle.abort();
        }
        tracing::info!("impactd shut down");

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
