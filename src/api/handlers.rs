use axum::{
    extract::{ConnectInfo, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use std::net::SocketAddr;
use tracing::{debug, error, warn};

use crate::api::{
    state::AppState,
    types::{
        ClientSummary, ClientsListResponse, CommandResponse, ControlQuery, HomeResponse,
        StatusMessage,
    },
};
use crate::domain::ClientStatus;
use crate::error::LinkwatchError;

/// GET / -- liveness probe with coordinator uptime
pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        status: "success".to_string(),
        message: "Server is running!".to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// POST /register -- upsert the calling agent into the registry.
///
/// The caller's identity is its observed peer address; there is no body.
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> std::result::Result<Json<StatusMessage>, (StatusCode, String)> {
    match state.registry.register(&addr.ip()).await {
        Ok(()) => Ok(Json(StatusMessage::success(
            "Client registered successfully.",
        ))),
        Err(LinkwatchError::AddressPolicy(msg)) => {
            warn!(identity = %addr.ip(), "Rejected registration: {}", msg);
            Ok(Json(StatusMessage::fail(msg)))
        }
        Err(e) => {
            error!(identity = %addr.ip(), "Registration failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /check_command -- the poll path every agent hits each tick.
pub async fn check_command(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> std::result::Result<Json<CommandResponse>, (StatusCode, String)> {
    match state.registry.lookup(&addr.ip()).await {
        Ok(Some(status)) => {
            debug!(identity = %addr.ip(), status = %status, "Command check");
            Ok(Json(CommandResponse::assigned(status.as_str())))
        }
        Ok(None) => Ok(Json(CommandResponse::not_registered())),
        Err(e) => {
            error!(identity = %addr.ip(), "Command lookup failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /control_clients?command=start|stop -- operator broadcast.
pub async fn control_clients(
    State(state): State<AppState>,
    Query(query): Query<ControlQuery>,
) -> std::result::Result<Json<StatusMessage>, (StatusCode, String)> {
    let command = match query.command.as_deref() {
        Some("start") => ClientStatus::Start,
        Some("stop") => ClientStatus::Stop,
        _ => {
            return Ok(Json(StatusMessage::fail(
                "Invalid command. Use 'start' or 'stop'.",
            )))
        }
    };

    match state.registry.broadcast(command).await {
        Ok(affected) => Ok(Json(StatusMessage::success(format!(
            "Command '{}' sent to {} clients.",
            command, affected
        )))),
        Err(e) => {
            error!(command = %command, "Broadcast failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// POST /upload_log -- accept a session artifact as a multipart blob.
///
/// The blob is opaque to the coordinator; it is persisted verbatim under the
/// caller's identity. A fail response leaves the agent's local copy intact.
pub async fn upload_log(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut multipart: Multipart,
) -> std::result::Result<Json<StatusMessage>, (StatusCode, String)> {
    let mut blob: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("log") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            blob = Some(bytes.to_vec());
        }
    }

    let Some(blob) = blob.filter(|b| !b.is_empty()) else {
        return Ok(Json(StatusMessage::fail("No log file provided.")));
    };

    match state.intake.receive(&addr.ip(), &blob).await {
        Ok(_) => Ok(Json(StatusMessage::success("Log uploaded successfully."))),
        Err(e) => {
            error!(identity = %addr.ip(), "Log intake failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /clients -- operator view of the registry, most recent check-in first.
pub async fn list_clients(
    State(state): State<AppState>,
) -> std::result::Result<Json<ClientsListResponse>, (StatusCode, String)> {
    let clients = state
        .registry
        .list()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let clients: Vec<ClientSummary> = clients
        .into_iter()
        .map(|c| ClientSummary {
            identity: c.identity,
            last_checkin: c.last_checkin,
            status: c.status.as_str().to_string(),
        })
        .collect();

    let total = clients.len();
    Ok(Json(ClientsListResponse { clients, total }))
}
