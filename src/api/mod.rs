//! REST boundary - the dashboard's view of the control plane.
//!
//! Routes live under `/api/bot`; `/health` sits at the root for probes.

/// Error to HTTP response mapping
pub mod error;
/// Route handlers
pub mod handlers;

use crate::{core::ControlPlane, errors::Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use error::ApiError;

/// Builds the full router over `plane`.
pub fn router(plane: ControlPlane) -> Router {
    let bot_routes = Router::new()
        .route(
            "/config",
            get(handlers::get_config).post(handlers::update_config),
        )
        .route(
            "/connect",
            post(handlers::connect).delete(handlers::disconnect),
        )
        .route("/send", post(handlers::send_message))
        .route(
            "/commands",
            get(handlers::list_commands).post(handlers::command_action),
        )
        .route("/logs", get(handlers::list_logs))
        .route("/status", get(handlers::status));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/bot", bot_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(plane)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, plane: ControlPlane, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        info!("Dashboard API listening on http://{}", address);
    }
    axum::serve(listener, router(plane))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
