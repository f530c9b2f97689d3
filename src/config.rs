use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

use crate::validation::is_private_socket;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub coordinator: CoordinatorConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Address the API server binds to. Must be a private-range address;
    /// startup fails otherwise.
    pub bind_addr: String,
    /// SQLite connection URL for the client registry
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Directory where uploaded agent logs are stored
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_database_url() -> String {
    "sqlite://linkwatch.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_dir() -> String {
    "client_logs".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Coordinator address (ip:port). Must be a private-range address;
    /// the agent exits otherwise.
    pub coordinator_addr: String,
    /// Seconds between monitor ticks / command polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Timeout for the connectivity probe and every coordinator call
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Well-known reachable endpoint probed each tick
    #[serde(default = "default_probe_addr")]
    pub probe_addr: String,
    /// Directory holding session artifacts until they upload
    #[serde(default = "default_spool_dir")]
    pub spool_dir: String,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_probe_addr() -> String {
    "8.8.8.8:53".to_string()
}

fn default_spool_dir() -> String {
    "spool".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("coordinator.bind_addr", "127.0.0.1:5000")?
            .set_default("coordinator.database_url", default_database_url())?
            .set_default("coordinator.max_connections", 5)?
            .set_default("coordinator.log_dir", default_log_dir())?
            .set_default("agent.coordinator_addr", "127.0.0.1:5000")?
            .set_default("agent.poll_interval_secs", 10)?
            .set_default("agent.probe_timeout_secs", 5)?
            .set_default("agent.probe_addr", default_probe_addr())?
            .set_default("agent.spool_dir", default_spool_dir())?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("LINKWATCH_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (LINKWATCH_AGENT__COORDINATOR_ADDR, etc.)
            .add_source(
                Environment::with_prefix("LINKWATCH")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match self.coordinator.bind_addr.parse::<SocketAddr>() {
            Ok(addr) if !is_private_socket(&addr) => {
                errors.push(format!(
                    "coordinator.bind_addr {} is not a private-range address",
                    addr
                ));
            }
            Ok(_) => {}
            Err(e) => errors.push(format!(
                "coordinator.bind_addr '{}' is not a valid socket address: {}",
                self.coordinator.bind_addr, e
            )),
        }

        match self.agent.coordinator_addr.parse::<SocketAddr>() {
            Ok(addr) if !is_private_socket(&addr) => {
                errors.push(format!(
                    "agent.coordinator_addr {} is not a private-range address",
                    addr
                ));
            }
            Ok(_) => {}
            Err(e) => errors.push(format!(
                "agent.coordinator_addr '{}' is not a valid socket address: {}",
                self.agent.coordinator_addr, e
            )),
        }

        if self.agent.poll_interval_secs == 0 {
            errors.push("agent.poll_interval_secs must be positive".to_string());
        }

        if self.agent.probe_timeout_secs == 0 {
            errors.push("agent.probe_timeout_secs must be positive".to_string());
        }

        if self.coordinator.max_connections == 0 {
            errors.push("coordinator.max_connections must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            coordinator: CoordinatorConfig {
                bind_addr: "192.168.1.100:5000".to_string(),
                database_url: default_database_url(),
                max_connections: 5,
                log_dir: default_log_dir(),
            },
            agent: AgentConfig {
                coordinator_addr: "192.168.1.100:5000".to_string(),
                poll_interval_secs: 10,
                probe_timeout_secs: 5,
                probe_addr: default_probe_addr(),
                spool_dir: default_spool_dir(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_public_coordinator_addr_rejected() {
        let mut cfg = base_config();
        cfg.agent.coordinator_addr = "8.8.8.8:5000".to_string();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("private-range")));
    }

    #[test]
    fn test_public_bind_addr_rejected() {
        let mut cfg = base_config();
        cfg.coordinator.bind_addr = "93.184.216.34:5000".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut cfg = base_config();
        cfg.agent.poll_interval_secs = 0;
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("poll_interval")));
    }
}
