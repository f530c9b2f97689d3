use crate::coordinator::store::SqliteStore;
use crate::domain::{ClientRecord, ClientStatus};
use crate::error::{LinkwatchError, Result};
use crate::validation::is_private_addr;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::net::IpAddr;
use tracing::{info, instrument};

/// Authoritative table of known agents, keyed by observed network identity.
///
/// Identity is the peer address the coordinator sees on an inbound request.
/// That is a weak-identity scheme (any host on the private network can hold
/// any address); the private-range admission gate below is policy, not
/// authentication.
#[derive(Clone)]
pub struct ClientRegistry {
    store: SqliteStore,
}

impl ClientRegistry {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Register an agent, or refresh its row if it is already known.
    ///
    /// Upsert keyed by identity: a new identity gets a row with
    /// status=active and last_checkin=now; an existing identity has its
    /// last_checkin refreshed and status forced back to active. The UNIQUE
    /// constraint on identity makes concurrent registrations last-write-wins
    /// without duplicate rows.
    #[instrument(skip(self))]
    pub async fn register(&self, identity: &IpAddr) -> Result<()> {
        if !is_private_addr(identity) {
            return Err(LinkwatchError::AddressPolicy(
                "Public IPs are not allowed.".to_string(),
            ));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO clients (identity, last_checkin, status)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(identity) DO UPDATE SET
                last_checkin = excluded.last_checkin,
                status = 'active'
            "#,
        )
        .bind(identity.to_string())
        .bind(now)
        .bind(ClientStatus::Active.as_str())
        .execute(self.store.pool())
        .await?;

        info!(identity = %identity, "Client registered");
        Ok(())
    }

    /// Assigned status for an identity, or None if it never registered.
    /// This is the read path agents poll every tick.
    pub async fn lookup(&self, identity: &IpAddr) -> Result<Option<ClientStatus>> {
        let row = sqlx::query("SELECT status FROM clients WHERE identity = ?1")
            .bind(identity.to_string())
            .fetch_optional(self.store.pool())
            .await?;

        match row {
            Some(r) => {
                let status: String = r.get("status");
                let status = ClientStatus::try_from(status.as_str())
                    .map_err(LinkwatchError::Internal)?;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    /// Broadcast a command to every registered agent.
    ///
    /// One unconditional UPDATE sets every row's status; there is no
    /// per-agent targeting. Returns the number of affected rows.
    #[instrument(skip(self))]
    pub async fn broadcast(&self, command: ClientStatus) -> Result<u64> {
        if !command.is_command() {
            return Err(LinkwatchError::InvalidCommand(format!(
                "Invalid command '{}'. Use 'start' or 'stop'.",
                command
            )));
        }

        let result = sqlx::query("UPDATE clients SET status = ?1")
            .bind(command.as_str())
            .execute(self.store.pool())
            .await?;

        let affected = result.rows_affected();
        info!(command = %command, affected, "Broadcast command to clients");
        Ok(affected)
    }

    /// All known clients, most recent check-in first. Operator read path;
    /// stale rows are visible here but never evicted.
    pub async fn list(&self) -> Result<Vec<ClientRecord>> {
        let rows = sqlx::query(
            "SELECT identity, last_checkin, status FROM clients ORDER BY last_checkin DESC",
        )
        .fetch_all(self.store.pool())
        .await?;

        rows.into_iter()
            .map(|r| {
                let status: String = r.get("status");
                let status = ClientStatus::try_from(status.as_str())
                    .map_err(LinkwatchError::Internal)?;
                Ok(ClientRecord {
                    identity: r.get("identity"),
                    last_checkin: r.get::<DateTime<Utc>, _>("last_checkin"),
                    status,
                })
            })
            .collect()
    }
}
