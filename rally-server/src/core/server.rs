//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::net::SocketAddr;
use std::time::Duration;

use crate::api;
use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result, ServerError, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    pub async fn run(self) -> Result<()> {
        // Start background tasks (job queue worker)
        let mut tasks = BackgroundTasks::new();
        self.state.start_background_tasks(&mut tasks);
        tasks.log_summary();

        let app = api::router(self.state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(e.into()))?;
        tracing::info!("rally server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.into()))?;

        // Stop background tasks within the configured timeout
        let timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        if tokio::time::timeout(timeout, tasks.shutdown()).await.is_err() {
            tracing::warn!("background tasks did not stop within shutdown timeout");
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down...");
}
