use clap::Parser;
use linkwatch::agent::{ArtifactSpool, CoordinatorClient, MonitorLoop, TcpProbe};
use linkwatch::api::{self, AppState};
use linkwatch::cli::{Cli, Commands};
use linkwatch::config::{AppConfig, LoggingConfig};
use linkwatch::coordinator::{ClientRegistry, LogIntake, SqliteStore};
use linkwatch::error::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)?;
    apply_overrides(&mut config, &cli);

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Configuration error: {e}");
        }
        std::process::exit(1);
    }

    init_logging(&config.logging);

    match &cli.command {
        Commands::Coordinator { .. } => run_coordinator(config).await,
        Commands::Agent { .. } => run_agent(config).await,
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    match &cli.command {
        Commands::Coordinator { bind } => {
            if let Some(bind) = bind {
                config.coordinator.bind_addr = bind.clone();
            }
        }
        Commands::Agent {
            coordinator,
            poll_interval,
        } => {
            if let Some(addr) = coordinator {
                config.agent.coordinator_addr = addr.clone();
            }
            if let Some(secs) = poll_interval {
                config.agent.poll_interval_secs = *secs;
            }
        }
    }
}

fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},linkwatch=debug,sqlx=warn", cfg.level)));

    if cfg.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_coordinator(config: AppConfig) -> Result<()> {
    let bind_addr: SocketAddr = config.coordinator.bind_addr.parse()?;

    let store = SqliteStore::new(
        &config.coordinator.database_url,
        config.coordinator.max_connections,
    )
    .await?;
    store.migrate().await?;

    let registry = ClientRegistry::new(store);
    let intake = LogIntake::new(&config.coordinator.log_dir);
    intake.ensure_dir().await?;

    let state = AppState::new(registry, intake);

    tokio::select! {
        result = api::serve(bind_addr, state) => result,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping coordinator");
            Ok(())
        }
    }
}

async fn run_agent(config: AppConfig) -> Result<()> {
    let coordinator_addr: SocketAddr = config.agent.coordinator_addr.parse()?;
    let probe_addr: SocketAddr = config.agent.probe_addr.parse()?;
    let timeout = Duration::from_secs(config.agent.probe_timeout_secs);
    let poll_interval = Duration::from_secs(config.agent.poll_interval_secs);

    let client = CoordinatorClient::new(format!("http://{coordinator_addr}"), timeout)?;

    // The agent cannot function unregistered: one attempt, fatal on failure.
    if let Err(e) = client.register().await {
        error!("Error registering with coordinator: {}", e);
        std::process::exit(1);
    }
    info!(coordinator = %coordinator_addr, "Registered with coordinator");

    let spool = ArtifactSpool::new(&config.agent.spool_dir);
    spool.ensure_dir().await?;

    let probe = TcpProbe::new(probe_addr, timeout);
    let mut monitor = MonitorLoop::new(probe, client, spool, poll_interval);

    tokio::select! {
        result = monitor.run() => result,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping agent");
            Ok(())
        }
    }
}
