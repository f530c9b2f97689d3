use thiserror::Error;

/// Main error type for the coordinator and agent
#[derive(Error, Debug)]
pub enum LinkwatchError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Address parsing error: {0}")]
    AddressParsing(#[from] std::net::AddrParseError),

    // Admission policy: the coordinator only serves a trusted private network
    #[error("Address policy violation: {0}")]
    AddressPolicy(String),

    // Protocol errors
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for LinkwatchError
pub type Result<T> = std::result::Result<T, LinkwatchError>;
