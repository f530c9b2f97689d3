use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::ClientStatus;
use crate::error::{LinkwatchError, Result};

/// Typed outcome of one command poll. Transient failures are a normal branch,
/// not an error: the loop logs them and polls again next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The coordinator returned the caller's assigned status.
    Assigned(ClientStatus),
    /// The coordinator does not know this identity.
    NotRegistered,
    /// The coordinator returned a status string this agent does not know.
    Unrecognized(String),
    /// Network or protocol failure; treated as "no command received".
    Transient,
}

/// The coordinator as seen from the monitor loop. A trait seam so loop tests
/// can script command sequences and count upload attempts.
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn check_command(&self) -> PollOutcome;

    /// Upload one session artifact. True only on confirmed success; the
    /// caller must keep its local copy on anything else.
    async fn upload_log(&self, blob: Vec<u8>) -> bool;
}

#[derive(serde::Deserialize)]
struct StatusMessageBody {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(serde::Deserialize)]
struct CommandBody {
    status: String,
    #[serde(default)]
    command: Option<String>,
}

/// HTTP client for the coordinator's protocol endpoints. Every call carries
/// a fixed timeout; no call blocks indefinitely.
pub struct CoordinatorClient {
    base_url: String,
    http: reqwest::Client,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Register with the coordinator. The agent cannot function
    /// unregistered, so any failure here is an error the caller treats as
    /// fatal.
    pub async fn register(&self) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/register", self.base_url))
            .send()
            .await?;
        let body: StatusMessageBody = resp.json().await?;

        if body.status == "success" {
            Ok(())
        } else {
            Err(LinkwatchError::Internal(format!(
                "registration rejected: {}",
                body.message.unwrap_or_else(|| "no message".to_string())
            )))
        }
    }
}

#[async_trait]
impl Coordinator for CoordinatorClient {
    async fn check_command(&self) -> PollOutcome {
        let resp = self
            .http
            .get(format!("{}/check_command", self.base_url))
            .send()
            .await;

        let body: CommandBody = match resp {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Malformed command response: {}", e);
                    return PollOutcome::Transient;
                }
            },
            Err(e) => {
                warn!("Error checking command: {}", e);
                return PollOutcome::Transient;
            }
        };

        if body.status != "success" {
            return PollOutcome::NotRegistered;
        }

        match body.command.as_deref() {
            Some(raw) => match ClientStatus::try_from(raw) {
                Ok(status) => PollOutcome::Assigned(status),
                Err(_) => PollOutcome::Unrecognized(raw.to_string()),
            },
            None => {
                debug!("Command response carried no command");
                PollOutcome::Transient
            }
        }
    }

    async fn upload_log(&self, blob: Vec<u8>) -> bool {
        let form = Form::new().part("log", Part::bytes(blob).file_name("connectivity.log"));

        let resp = self
            .http
            .post(format!("{}/upload_log", self.base_url))
            .multipart(form)
            .send()
            .await;

        match resp {
            Ok(resp) => match resp.json::<StatusMessageBody>().await {
                Ok(body) if body.status == "success" => true,
                Ok(body) => {
                    warn!(
                        "Log upload rejected: {}",
                        body.message.unwrap_or_else(|| "no message".to_string())
                    );
                    false
                }
                Err(e) => {
                    warn!("Malformed upload response: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Log upload failed: {}", e);
                false
            }
        }
    }
}
