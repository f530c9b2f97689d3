//! Agent-side components: the connectivity prober, the coordinator client,
//! session logging with the artifact spool, and the monitor loop that ties
//! them together.

pub mod client;
pub mod log;
pub mod monitor;
pub mod sampler;

pub use client::{Coordinator, CoordinatorClient, PollOutcome};
pub use log::{ArtifactSpool, SessionLog};
pub use monitor::MonitorLoop;
pub use sampler::{Probe, TcpProbe};
