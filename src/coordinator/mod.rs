//! Coordinator-side state: the client registry, its SQLite store, and the
//! log intake that receives uploaded session artifacts.

pub mod intake;
pub mod registry;
pub mod store;

pub use intake::LogIntake;
pub use registry::ClientRegistry;
pub use store::SqliteStore;
