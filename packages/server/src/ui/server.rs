//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use chatline_shared::time::{Clock, SystemClock};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;

use crate::{config::ServerConfig, usecase::PresenceBroadcaster};

use super::{
    handler::{
        get_message_history, get_presence, health_check, list_conversations,
        resolve_conversation, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Presence and message routing server
///
/// `new` starts the background tasks (presence broadcaster and stale sweeper),
/// so it must be called inside a Tokio runtime.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::default());
/// server.run().await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    background_tasks: Vec<JoinHandle<()>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let (state, feed) = AppState::build(config, clock);
        let state = Arc::new(state);

        let mut background_tasks =
            vec![PresenceBroadcaster::new(state.message_pusher.clone()).spawn(feed)];
        match (state.config.heartbeat_interval(), state.config.stale_after()) {
            (Some(interval), Some(stale_after)) => {
                background_tasks.push(
                    state
                        .connection_lifecycle_usecase
                        .clone()
                        .spawn_stale_sweeper(interval, stale_after),
                );
            }
            _ => tracing::info!("Stale connection sweep disabled"),
        }

        Self {
            state,
            background_tasks,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// HTTP and WebSocket routes
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/presence", get(get_presence))
            .route("/api/conversations", post(resolve_conversation))
            .route(
                "/api/users/{user_id}/conversations",
                get(list_conversations),
            )
            .route(
                "/api/conversations/{conversation_id}/messages",
                get(get_message_history),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to the configured address and serve until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address or
    /// if there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = self.state.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until a shutdown signal arrives
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!("Chatline server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?user_id=<id>", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        for task in &self.background_tasks {
            task.abort();
        }
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
