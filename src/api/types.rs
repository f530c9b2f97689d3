use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol response body: `{"status": "success"|"fail", "message": ...}`.
///
/// Agents branch on the `status` field, so both outcomes are carried in the
/// body rather than only in the HTTP status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail".to_string(),
            message: message.into(),
        }
    }
}

/// Liveness response for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeResponse {
    pub status: String,
    pub message: String,
    pub uptime_seconds: i64,
}

/// Response to `GET /check_command`: the agent's assigned status, or a fail
/// message if the caller never registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn assigned(command: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            command: Some(command.into()),
            message: None,
        }
    }

    pub fn not_registered() -> Self {
        Self {
            status: "fail".to_string(),
            command: None,
            message: Some("Client not registered.".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ControlQuery {
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub identity: String,
    pub last_checkin: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsListResponse {
    pub clients: Vec<ClientSummary>,
    pub total: usize,
}
