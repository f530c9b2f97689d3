use crate::coordinator::{ClientRegistry, LogIntake};
use chrono::{DateTime, Utc};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Client registry backed by the SQLite store
    pub registry: ClientRegistry,

    /// Log intake for uploaded session artifacts
    pub intake: LogIntake,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(registry: ClientRegistry, intake: LogIntake) -> Self {
        Self {
            registry,
            intake,
            start_time: Utc::now(),
        }
    }

    /// Get coordinator uptime in seconds
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
