//! Coordinator HTTP API: the four protocol endpoints agents poll plus a
//! small operator surface.

pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

pub use routes::{create_router, serve};
pub use state::AppState;
