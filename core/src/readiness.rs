//! Waiting for a freshly launched service
//!
//! The default is a fixed delay with no verification. A service may opt into
//! a bounded TCP poll instead, which returns as soon as the port accepts a
//! connection and gives up quietly at the timeout.

use schema::Readiness;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

/// Outcome of a readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// A fixed delay ran out; nothing was verified
    Elapsed,
    /// The service accepted a connection
    Reachable,
    /// The poll gave up without reaching the service
    TimedOut,
}

/// TCP connect probe against a single address
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    /// Create a probe for `host:port` with a per-attempt connect timeout
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Target address as a string
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a connection can be established within the timeout
    pub async fn check(&self) -> bool {
        let address = self.address();
        match timeout(self.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_stream)) => {
                debug!("TCP probe to {} succeeded", address);
                true
            }
            Ok(Err(e)) => {
                debug!("TCP probe to {} failed: {}", address, e);
                false
            }
            Err(_) => {
                debug!("TCP probe to {} timed out after {:?}", address, self.timeout);
                false
            }
        }
    }
}

/// Wait according to `readiness`
pub async fn wait_for(readiness: &Readiness) -> ReadyState {
    let limit = readiness.max_wait();
    match readiness {
        Readiness::FixedDelay { .. } => {
            sleep(limit).await;
            ReadyState::Elapsed
        }
        Readiness::TcpPoll {
            host,
            port,
            interval_ms,
            ..
        } => {
            let interval = Duration::from_millis((*interval_ms).max(1));
            let probe = TcpProbe::new(host.clone(), *port, interval.max(Duration::from_millis(100)));
            poll_until(&probe, interval, deadline_after(Instant::now(), limit)).await
        }
    }
}

/// `start + limit`, saturating at a far-off instant instead of overflowing
fn deadline_after(start: Instant, limit: Duration) -> Instant {
    start
        .checked_add(limit)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// About thirty years; always representable as an `Instant` offset
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

async fn poll_until(probe: &TcpProbe, interval: Duration, deadline: Instant) -> ReadyState {
    loop {
        if probe.check().await {
            return ReadyState::Reachable;
        }
        let now = Instant::now();
        if now >= deadline {
            return ReadyState::TimedOut;
        }
        sleep(interval.min(deadline - now)).await;
    }
}
