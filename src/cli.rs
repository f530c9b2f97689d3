use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "linkwatch")]
#[command(version = "0.1.0")]
#[command(about = "Fleet connectivity monitoring with a poll-based coordinator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory path
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the coordinator: client registry, command dispatch and log intake
    Coordinator {
        /// Bind address override (must be private-range, e.g. 192.168.1.100:5000)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run a monitoring agent against a coordinator
    Agent {
        /// Coordinator address override (must be private-range)
        #[arg(long)]
        coordinator: Option<String>,
        /// Seconds between monitor ticks / command polls
        #[arg(long)]
        poll_interval: Option<u64>,
    },
}
