use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::agent::client::{Coordinator, PollOutcome};
use crate::agent::log::{ArtifactSpool, SessionLog};
use crate::agent::sampler::Probe;
use crate::domain::ClientStatus;
use crate::error::Result;

/// The agent's monitor loop: a two-state machine driven entirely by polled
/// commands.
///
/// IDLE polls the coordinator every tick; "start" enters MONITORING.
/// MONITORING samples connectivity each tick, records transitions, and exits
/// back to IDLE on "stop", flushing the session to an artifact and uploading
/// every pending artifact. No failure of a single network call escapes the
/// loop.
pub struct MonitorLoop<P, C> {
    probe: P,
    coordinator: C,
    spool: ArtifactSpool,
    poll_interval: Duration,
}

impl<P: Probe, C: Coordinator> MonitorLoop<P, C> {
    pub fn new(probe: P, coordinator: C, spool: ArtifactSpool, poll_interval: Duration) -> Self {
        Self {
            probe,
            coordinator,
            spool,
            poll_interval,
        }
    }

    /// Top-level driver. Polls every tick regardless of state and never
    /// returns under normal operation.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.drive_tick().await;
            sleep(self.poll_interval).await;
        }
    }

    /// One driver iteration: poll for the assigned command and, on "start",
    /// run a full monitoring session to completion. Infallible: no single
    /// failed network call or local disk error escapes the loop.
    pub async fn drive_tick(&mut self) {
        match self.coordinator.check_command().await {
            PollOutcome::Assigned(ClientStatus::Start) => {
                info!("Start command received, beginning monitoring");
                self.monitor_session().await;
            }
            PollOutcome::Assigned(ClientStatus::Stop) => {
                debug!("Stop command while idle, nothing to do");
            }
            PollOutcome::Assigned(status) => {
                debug!(status = %status, "No actionable command");
            }
            PollOutcome::NotRegistered => {
                warn!("Coordinator does not know this agent; re-register to receive commands");
            }
            PollOutcome::Unrecognized(raw) => {
                warn!(command = %raw, "Ignoring unrecognized command");
            }
            PollOutcome::Transient => {
                debug!("No command received");
            }
        }
    }

    /// The MONITORING state. Each tick: sample, record a transition if the
    /// sample disagrees with the current belief, then poll for the command
    /// before sleeping -- so a stop is honored within one tick, not after an
    /// extra idle sleep.
    async fn monitor_session(&mut self) {
        let mut session = SessionLog::new();

        loop {
            let reachable = self.probe.sample().await;
            if let Some(event) = session.record_sample(reachable, Utc::now()) {
                info!(event = %event.to_line(), "Connectivity transition");
            }

            match self.coordinator.check_command().await {
                PollOutcome::Assigned(ClientStatus::Stop) => {
                    info!("Stop command received, ending monitoring session");
                    break;
                }
                PollOutcome::Assigned(ClientStatus::Start) => {
                    // Already monitoring; start is idempotent.
                }
                PollOutcome::Assigned(status) => {
                    debug!(status = %status, "Ignoring non-command status mid-session");
                }
                PollOutcome::Unrecognized(raw) => {
                    warn!(command = %raw, "Ignoring unrecognized command mid-session");
                }
                PollOutcome::NotRegistered | PollOutcome::Transient => {
                    debug!("No command received, continuing session");
                }
            }

            sleep(self.poll_interval).await;
        }

        self.flush_and_upload(session).await;
    }

    /// Flush the finished session and attempt one upload pass over every
    /// pending artifact. Deletion strictly follows a confirmed upload; a
    /// failed upload leaves the artifact for the next pass. Local disk
    /// errors are absorbed the same way upload failures are: whatever is
    /// still on disk gets another chance at the next session end.
    async fn flush_and_upload(&mut self, session: SessionLog) {
        if session.is_empty() {
            debug!("Session recorded no transitions, nothing to upload");
        } else if let Err(e) = self.spool.flush(&session).await {
            warn!(
                events = session.events().len(),
                "Failed to flush session artifact: {}", e
            );
        }

        let pending = match self.spool.pending().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Failed to scan artifact spool: {}", e);
                return;
            }
        };

        for path in pending {
            let blob = match tokio::fs::read(&path).await {
                Ok(blob) => blob,
                Err(e) => {
                    warn!(path = %path.display(), "Failed to read artifact: {}", e);
                    continue;
                }
            };
            if self.coordinator.upload_log(blob).await {
                info!(path = %path.display(), "Log uploaded successfully");
                if let Err(e) = self.spool.remove(&path).await {
                    warn!(path = %path.display(), "Failed to remove uploaded artifact: {}", e);
                }
            } else {
                warn!(path = %path.display(), "Upload failed, artifact retained for retry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedProbe {
        samples: Mutex<VecDeque<bool>>,
    }

    impl ScriptedProbe {
        fn new(samples: &[bool]) -> Self {
            Self {
                samples: Mutex::new(samples.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn sample(&self) -> bool {
            // Past the end of the script the link stays up.
            self.samples.lock().unwrap().pop_front().unwrap_or(true)
        }
    }

    #[derive(Clone)]
    struct ScriptedCoordinator {
        outcomes: Arc<Mutex<VecDeque<PollOutcome>>>,
        uploads: Arc<Mutex<Vec<Vec<u8>>>>,
        upload_ok: Arc<AtomicBool>,
    }

    impl ScriptedCoordinator {
        fn new(outcomes: &[PollOutcome]) -> Self {
            Self {
                outcomes: Arc::new(Mutex::new(outcomes.iter().cloned().collect())),
                uploads: Arc::new(Mutex::new(Vec::new())),
                upload_ok: Arc::new(AtomicBool::new(true)),
            }
        }

        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Coordinator for ScriptedCoordinator {
        async fn check_command(&self) -> PollOutcome {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(PollOutcome::Assigned(ClientStatus::Stop))
        }

        async fn upload_log(&self, blob: Vec<u8>) -> bool {
            self.uploads.lock().unwrap().push(blob);
            self.upload_ok.load(Ordering::SeqCst)
        }
    }

    fn monitor_loop(
        probe: ScriptedProbe,
        coordinator: ScriptedCoordinator,
        dir: &std::path::Path,
    ) -> MonitorLoop<ScriptedProbe, ScriptedCoordinator> {
        MonitorLoop::new(
            probe,
            coordinator,
            ArtifactSpool::new(dir),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_stop_honored_within_one_tick() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::new(&[false]);
        let coordinator = ScriptedCoordinator::new(&[
            PollOutcome::Assigned(ClientStatus::Start),
            PollOutcome::Assigned(ClientStatus::Stop),
        ]);

        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        // Session saw exactly one tick: one disconnect event, one upload.
        assert_eq!(coordinator.upload_count(), 1);
        let payload = String::from_utf8(coordinator.uploads.lock().unwrap()[0].clone()).unwrap();
        assert_eq!(payload.lines().count(), 1);
        assert!(payload.starts_with("Disconnected at "));
    }

    #[tokio::test]
    async fn test_transitions_survive_to_upload() {
        let dir = tempfile::tempdir().unwrap();
        // up, up, down, down, up then stop
        let probe = ScriptedProbe::new(&[true, true, false, false, true]);
        let coordinator = ScriptedCoordinator::new(&[
            PollOutcome::Assigned(ClientStatus::Start),
            PollOutcome::Transient,
            PollOutcome::Transient,
            PollOutcome::Transient,
            PollOutcome::Transient,
            PollOutcome::Assigned(ClientStatus::Stop),
        ]);

        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        let payload = String::from_utf8(coordinator.uploads.lock().unwrap()[0].clone()).unwrap();
        let lines: Vec<&str> = payload.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Disconnected at "));
        assert!(lines[1].starts_with("Reconnected at "));
    }

    #[tokio::test]
    async fn test_failed_upload_retains_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::new(&[false]);
        let coordinator = ScriptedCoordinator::new(&[
            PollOutcome::Assigned(ClientStatus::Start),
            PollOutcome::Assigned(ClientStatus::Stop),
        ]);
        coordinator.upload_ok.store(false, Ordering::SeqCst);

        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        assert_eq!(coordinator.upload_count(), 1);
        let pending: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_successful_upload_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::new(&[false]);
        let coordinator = ScriptedCoordinator::new(&[
            PollOutcome::Assigned(ClientStatus::Start),
            PollOutcome::Assigned(ClientStatus::Stop),
        ]);

        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        assert_eq!(coordinator.upload_count(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_pending_artifact_retried_at_next_session_end() {
        let dir = tempfile::tempdir().unwrap();

        // First session: upload fails, artifact stays behind.
        {
            let probe = ScriptedProbe::new(&[false]);
            let coordinator = ScriptedCoordinator::new(&[
                PollOutcome::Assigned(ClientStatus::Start),
                PollOutcome::Assigned(ClientStatus::Stop),
            ]);
            coordinator.upload_ok.store(false, Ordering::SeqCst);
            let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
            looper.drive_tick().await;
        }

        // Second session: its own artifact plus the stale one both upload.
        let probe = ScriptedProbe::new(&[false]);
        let coordinator = ScriptedCoordinator::new(&[
            PollOutcome::Assigned(ClientStatus::Start),
            PollOutcome::Assigned(ClientStatus::Stop),
        ]);
        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        assert_eq!(coordinator.upload_count(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_session_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::new(&[true, true]);
        let coordinator = ScriptedCoordinator::new(&[
            PollOutcome::Assigned(ClientStatus::Start),
            PollOutcome::Transient,
            PollOutcome::Assigned(ClientStatus::Stop),
        ]);

        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        assert_eq!(coordinator.upload_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_spool_failure_does_not_end_the_loop() {
        let probe = ScriptedProbe::new(&[false]);
        let coordinator = ScriptedCoordinator::new(&[
            PollOutcome::Assigned(ClientStatus::Start),
            PollOutcome::Assigned(ClientStatus::Stop),
            PollOutcome::Transient,
        ]);

        let mut looper = MonitorLoop::new(
            probe,
            coordinator.clone(),
            ArtifactSpool::new("/nonexistent/spool/dir"),
            Duration::from_millis(1),
        );

        // The session ends against a dead spool: the flush fails, nothing
        // uploads, and the driver keeps ticking afterwards.
        looper.drive_tick().await;
        assert_eq!(coordinator.upload_count(), 0);
        looper.drive_tick().await;
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::new(&[]);
        let coordinator = ScriptedCoordinator::new(&[PollOutcome::Assigned(ClientStatus::Stop)]);

        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        assert_eq!(coordinator.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_command_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::new(&[]);
        let coordinator =
            ScriptedCoordinator::new(&[PollOutcome::Unrecognized("restart".to_string())]);

        let mut looper = monitor_loop(probe, coordinator.clone(), dir.path());
        looper.drive_tick().await;

        assert_eq!(coordinator.upload_count(), 0);
    }
}
