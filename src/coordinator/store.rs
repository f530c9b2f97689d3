use crate::error::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

/// SQLite storage adapter for the client registry
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to SQLite at {}", database_url);
        Ok(Self { pool })
    }

    /// In-memory store for tests. Capped at one connection: every pooled
    /// connection to `sqlite::memory:` would otherwise see its own database.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::new("sqlite::memory:", 1).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
