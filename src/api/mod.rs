//! HTTP API server for the Atende gateway

pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::assistant::{Responder, Transcriber};
use crate::db::{ConversationStore, TenantDirectory};
use crate::provider::Messenger;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub tenants: Arc<dyn TenantDirectory>,
    pub conversations: Arc<dyn ConversationStore>,
    pub messenger: Arc<dyn Messenger>,
    pub transcriber: Arc<dyn Transcriber>,
    pub responder: Arc<dyn Responder>,
    /// Prior turns handed to the responder
    pub history_limit: usize,
}

/// Build the router with all routes
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    // CORS layer for cross-origin requests (config UI, monitoring)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(health::status))
        .route("/webhook", post(webhook::missing_instance))
        .route("/webhook/{instance}", post(webhook::handle_event))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state)).await?;

        Ok(())
    }
}
