use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Assigned status of a registered client.
///
/// `Inactive`/`Active` describe registration state; `Start`/`Stop` are the
/// two operator commands and overwrite every row when broadcast. Agents poll
/// this value verbatim, so the wire form is the lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Inactive,
    Active,
    Start,
    Stop,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    /// Only `start` and `stop` are valid broadcast commands.
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Start | Self::Stop)
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ClientStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(format!("unknown client status: {other}")),
        }
    }
}

/// One row of the coordinator's client registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub identity: String,
    pub last_checkin: DateTime<Utc>,
    pub status: ClientStatus,
}

/// Direction of a reachability transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Disconnected,
    Reconnected,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Reconnected => "Reconnected",
        }
    }
}

/// A recorded change in reachability. Appended only on transitions between
/// consecutive samples, never on steady-state samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl ConnectivityEvent {
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self { kind, timestamp }
    }

    /// Human-readable artifact line, e.g. `Disconnected at 2026-01-02T03:04:05Z`.
    pub fn to_line(&self) -> String {
        format!("{} at {}", self.kind.as_str(), self.timestamp.to_rfc3339())
    }
}
