//! TCP connect probe.
//!
//! Uses the operating system's socket API to attempt a full handshake and
//! classifies the result. Does not require elevated privileges.

use crate::scanner::traits::{ProbeOutcome, ProbeStatus, Prober, WorkItem};
use crate::types::Port;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default ports tried when checking whether a host is alive.
pub const DEFAULT_DISCOVERY_PORTS: [u16; 3] = [80, 443, 22];

/// Outcome of a single connect attempt.
#[derive(Debug)]
enum Connect {
    Accepted,
    Refused,
    TimedOut,
    Failed(io::Error),
}

/// TCP connect prober.
///
/// Port items are a single connect attempt. Host items try each discovery
/// port in turn, one connection at a time, and stop at the first port that
/// answers.
#[derive(Debug, Clone)]
pub struct TcpProber {
    discovery_ports: Vec<Port>,
}

impl TcpProber {
    /// Create a prober that uses `discovery_ports` for host items.
    pub fn new(discovery_ports: Vec<Port>) -> Self {
        Self { discovery_ports }
    }

    /// The ports tried for host discovery.
    pub fn discovery_ports(&self) -> &[Port] {
        &self.discovery_ports
    }

    async fn probe_host(&self, item: &WorkItem, ip: IpAddr, limit: Duration) -> ProbeOutcome {
        let start = Instant::now();
        let mut refused = false;
        let mut timed_out = false;
        let mut last_error = None;

        for port in &self.discovery_ports {
            match attempt_connect(SocketAddr::new(ip, port.as_u16()), limit).await {
                Connect::Accepted => {
                    return ProbeOutcome::new(item, ProbeStatus::Open, start.elapsed());
                }
                Connect::Refused => refused = true,
                Connect::TimedOut => timed_out = true,
                Connect::Failed(e) => last_error = Some(format!("port {port}: {e}")),
            }
        }

        let latency = start.elapsed();
        if refused {
            ProbeOutcome::new(item, ProbeStatus::Closed, latency)
        } else if timed_out {
            ProbeOutcome::new(item, ProbeStatus::Filtered, latency)
        } else {
            let detail = last_error.unwrap_or_else(|| "no discovery ports configured".into());
            ProbeOutcome::error(item, latency, detail)
        }
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(
            DEFAULT_DISCOVERY_PORTS
                .iter()
                .filter_map(|&p| Port::new(p))
                .collect(),
        )
    }
}

/// Attempt one connection. The stream, if any, is dropped before returning.
async fn attempt_connect(addr: SocketAddr, limit: Duration) -> Connect {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Connect::Accepted
        }
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => Connect::Refused,
        Ok(Err(e)) => Connect::Failed(e),
        Err(_) => Connect::TimedOut,
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, item: &WorkItem, limit: Duration) -> ProbeOutcome {
        match item {
            WorkItem::Host(target) => self.probe_host(item, target.ip, limit).await,
            WorkItem::Port(target, port) => {
                let start = Instant::now();
                let addr = SocketAddr::new(target.ip, port.as_u16());
                match attempt_connect(addr, limit).await {
                    Connect::Accepted => {
                        ProbeOutcome::new(item, ProbeStatus::Open, start.elapsed())
                    }
                    Connect::Refused => {
                        ProbeOutcome::new(item, ProbeStatus::Closed, start.elapsed())
                    }
                    Connect::TimedOut => {
                        ProbeOutcome::new(item, ProbeStatus::Filtered, start.elapsed())
                    }
                    Connect::Failed(e) => ProbeOutcome::error(item, start.elapsed(), e.to_string()),
                }
            }
        }
    }

    fn time_budget(&self, item: &WorkItem, limit: Duration) -> Duration {
        match item {
            WorkItem::Host(_) => {
                let attempts = u32::try_from(self.discovery_ports.len()).unwrap_or(u32::MAX);
                limit.saturating_mul(attempts.max(1))
            }
            WorkItem::Port(..) => limit,
        }
    }
}
