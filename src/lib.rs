pub mod agent;
pub mod api;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod validation;

pub use agent::{
    ArtifactSpool, Coordinator, CoordinatorClient, MonitorLoop, PollOutcome, SessionLog, TcpProbe,
};
pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use coordinator::{ClientRegistry, LogIntake, SqliteStore};
pub use domain::{ClientRecord, ClientStatus, ConnectivityEvent, EventKind};
pub use error::{LinkwatchError, Result};
