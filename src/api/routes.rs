use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::{handlers, state::AppState};
use crate::error::{LinkwatchError, Result};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Liveness
        .route("/", get(handlers::home))
        // Protocol endpoints (agent-initiated, identity = peer address)
        .route("/register", post(handlers::register))
        .route("/check_command", get(handlers::check_command))
        .route("/control_clients", get(handlers::control_clients))
        .route("/upload_log", post(handlers::upload_log))
        // Operator endpoints
        .route("/clients", get(handlers::list_clients))
        // Add state and CORS
        .with_state(state)
        .layer(cors)
}

/// Bind and serve the coordinator API.
///
/// Served with connect info so handlers can observe the peer address, which
/// is the protocol's notion of agent identity.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_router(state);

    info!("Starting coordinator API on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| LinkwatchError::Internal(format!("Coordinator server error: {}", e)))?;

    Ok(())
}
