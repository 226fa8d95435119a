use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;

use super::api::{cdr_agent, cdr_refresh, cdr_summary, cdr_time_range, health_check, AppState};

pub fn create_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/cdr/summary", get(cdr_summary))
        .route("/api/cdr/agent/:agent_id", get(cdr_agent))
        .route("/api/cdr/time_range", get(cdr_time_range))
        .route("/api/cdr/refresh", post(cdr_refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

/// Start the report HTTP server with graceful shutdown.
pub async fn run_server(
    engine: Arc<Engine>,
    listen: String,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(engine);

    let listener = TcpListener::bind(&listen).await?;
    tracing::info!("Web server listening on {}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&stop| stop).await;
            tracing::info!("Web server shutting down gracefully");
        })
        .await?;

    Ok(())
}
