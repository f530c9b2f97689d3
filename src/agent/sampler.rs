use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Reachability probe. One call classifies the link as up or down; the
/// monitor loop derives transitions by comparing consecutive samples.
#[async_trait]
pub trait Probe: Send + Sync {
    /// True if the probe target was reachable within the timeout.
    async fn sample(&self) -> bool;
}

/// Probes a fixed, well-known reachable endpoint (a public DNS resolver by
/// default) with a bounded TCP connect. Any failure -- timeout, refusal,
/// routing error -- classifies the link as down.
pub struct TcpProbe {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn sample(&self) -> bool {
        let reachable = matches!(
            timeout(self.timeout, TcpStream::connect(self.addr)).await,
            Ok(Ok(_))
        );
        trace!(addr = %self.addr, reachable, "Connectivity sample");
        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reachable_listener_samples_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe::new(addr, Duration::from_secs(1));
        assert!(probe.sample().await);
    }

    #[tokio::test]
    async fn test_refused_connection_samples_down() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpProbe::new(addr, Duration::from_secs(1));
        assert!(!probe.sample().await);
    }
}
