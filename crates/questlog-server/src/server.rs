//! HTTP server wiring.

use std::sync::Arc;

use axum::Router;
use questlog_core::Database;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes;

/// Application state shared across handlers.
pub struct AppState {
    /// One connection; each request holds the lock for its whole
    /// read-modify-write.
    pub db: Mutex<Database>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::user_routes())
        .merge(routes::stats_routes())
        .merge(routes::habit_routes())
        .merge(routes::daily_routes())
        .merge(routes::routine_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until ctrl-c.
pub async fn run(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    info!("  Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("  Shutting down");
    }
}
