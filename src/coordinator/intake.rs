use crate::error::{LinkwatchError, Result};
use chrono::Utc;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Receives uploaded session artifacts and persists them to the log
/// directory, one file per upload, named by agent identity and timestamp.
#[derive(Clone)]
pub struct LogIntake {
    log_dir: PathBuf,
}

impl LogIntake {
    pub fn new<P: Into<PathBuf>>(log_dir: P) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Create the log directory if it does not exist. Called once at startup.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.log_dir).await?;
        Ok(())
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Persist an uploaded blob under `{identity}_{timestamp}.log`.
    ///
    /// Second-granularity timestamps keep concurrent uploads from distinct
    /// agents collision-free (the identity prefix separates agents; one agent
    /// uploads sequentially). Empty blobs are rejected without persisting.
    /// On a write failure nothing is recorded and the caller reports the
    /// error, so the agent keeps its local copy for a future retry.
    pub async fn receive(&self, identity: &IpAddr, blob: &[u8]) -> Result<PathBuf> {
        if blob.is_empty() {
            warn!(identity = %identity, "Rejected empty log upload");
            return Err(LinkwatchError::Internal(
                "No log file provided.".to_string(),
            ));
        }

        let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let prefix = sanitize_identity(identity);
        let mut path = self.log_dir.join(format!("{prefix}_{stamp}.log"));
        let mut n = 1;
        while tokio::fs::try_exists(&path).await? {
            path = self.log_dir.join(format!("{prefix}_{stamp}_{n}.log"));
            n += 1;
        }

        tokio::fs::write(&path, blob).await?;
        info!(identity = %identity, path = %path.display(), bytes = blob.len(), "Stored uploaded log");
        Ok(path)
    }
}

// IPv6 identities contain ':', which is not filename-safe everywhere.
fn sanitize_identity(identity: &IpAddr) -> String {
    identity.to_string().replace(':', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_receive_writes_named_blob() {
        let dir = tempfile::tempdir().unwrap();
        let intake = LogIntake::new(dir.path());

        let path = intake
            .receive(&ip("192.168.1.10"), b"Disconnected at ...\n")
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("192.168.1.10_"));
        assert!(name.ends_with(".log"));
        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"Disconnected at ...\n".to_vec()
        );
    }

    #[tokio::test]
    async fn test_empty_blob_rejected_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let intake = LogIntake::new(dir.path());

        assert!(intake.receive(&ip("192.168.1.10"), b"").await.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_ipv6_identity_is_filename_safe() {
        let dir = tempfile::tempdir().unwrap();
        let intake = LogIntake::new(dir.path());

        let path = intake.receive(&ip("fd12::1"), b"x").await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.contains(':'));
        assert!(name.starts_with("fd12--1_"));
    }

    #[tokio::test]
    async fn test_same_second_uploads_do_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let intake = LogIntake::new(dir.path());
        let identity = ip("10.0.0.1");

        let first = intake.receive(&identity, b"first").await.unwrap();
        let second = intake.receive(&identity, b"second").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_error() {
        let intake = LogIntake::new("/nonexistent/dir/for/sure");
        let err = intake.receive(&ip("10.0.0.1"), b"x").await.unwrap_err();
        assert!(matches!(err, LinkwatchError::Io(_)));
    }
}
