//! HTTP receiver for repository change events.
//!
//! Provides an Axum-based HTTP server with:
//! - `POST /api/events`: run one notifier invocation on the request body
//! - `GET /api/health`: liveness and version

pub mod api;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use repo_event_notifier_core::EventNotifier;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub notifier: Arc<EventNotifier>,
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server around the given notifier.
    pub fn new(notifier: Arc<EventNotifier>) -> Self {
        Self {
            state: Arc::new(AppState { notifier }),
        }
    }

    /// Build the application router.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(api::status::routes())
            .merge(api::events::routes())
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MiB max request body
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on `listen_addr` until `shutdown` resolves.
    pub async fn start<F>(self, listen_addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listen_addr.parse()?;
        let app = self.router();

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
