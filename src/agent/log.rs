use crate::domain::{ConnectivityEvent, EventKind};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// In-memory transition buffer for one monitoring session.
///
/// Samples come in as raw reachability booleans; only disagreements with the
/// current belief are recorded. The optimistic prior is "connected", so a
/// session that starts during an outage records a disconnect on its first
/// sample.
#[derive(Debug)]
pub struct SessionLog {
    events: Vec<ConnectivityEvent>,
    is_connected: bool,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            is_connected: true,
        }
    }

    /// Feed one raw sample. Returns the recorded event if the sample was a
    /// transition, None on steady state.
    pub fn record_sample(
        &mut self,
        reachable: bool,
        now: DateTime<Utc>,
    ) -> Option<&ConnectivityEvent> {
        if reachable == self.is_connected {
            return None;
        }

        self.is_connected = reachable;
        let kind = if reachable {
            EventKind::Reconnected
        } else {
            EventKind::Disconnected
        };
        self.events.push(ConnectivityEvent::new(kind, now));
        self.events.last()
    }

    pub fn events(&self) -> &[ConnectivityEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize the session as the artifact payload, one line per event.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&event.to_line());
            out.push('\n');
        }
        out.into_bytes()
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds flushed session artifacts on disk until they are uploaded.
///
/// An artifact is removed only after a confirmed-successful upload, so a
/// failed upload leaves it pending for the next session end. That ordering
/// is the at-least-once delivery guarantee.
pub struct ArtifactSpool {
    dir: PathBuf,
}

impl ArtifactSpool {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Flush a session to a timestamped artifact file. Timestamps have
    /// second granularity, so a counter suffix keeps two flushes in the same
    /// second from clobbering each other.
    pub async fn flush(&self, session: &SessionLog) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let mut path = self.dir.join(format!("connectivity_{stamp}.log"));
        let mut n = 1;
        while tokio::fs::try_exists(&path).await? {
            path = self.dir.join(format!("connectivity_{stamp}_{n}.log"));
            n += 1;
        }
        tokio::fs::write(&path, session.to_bytes()).await?;
        info!(path = %path.display(), events = session.events().len(), "Flushed session artifact");
        Ok(path)
    }

    /// Every artifact still awaiting upload, oldest first.
    pub async fn pending(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "log") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Remove an artifact after its upload was confirmed.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await?;
        debug!(path = %path.display(), "Removed uploaded artifact");
        Ok(())
    }
}
