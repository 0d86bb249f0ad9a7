//! Probe abstraction.
//!
//! Defines the unit of work handed to the scheduler, the outcome each probe
//! produces, and the [`Prober`] trait that executes one work item.

use crate::types::{Port, Target};
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Connection accepted.
    Open,
    /// Connection actively refused.
    Closed,
    /// No answer before the probe timeout.
    Filtered,
    /// Any other I/O failure.
    Error,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Kind of scan a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Liveness sweep over a CIDR range.
    NetworkDiscovery,
    /// Port enumeration against a single host.
    PortScan,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkDiscovery => write!(f, "network-discovery"),
            Self::PortScan => write!(f, "port-scan"),
        }
    }
}

/// One unit of scheduled work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Is this host alive?
    Host(Target),
    /// Is this port open on this host?
    Port(Target, Port),
}

impl WorkItem {
    /// The host this item probes.
    pub fn target(&self) -> &Target {
        match self {
            Self::Host(target) | Self::Port(target, _) => target,
        }
    }

    /// The port this item probes, if any.
    pub fn port(&self) -> Option<Port> {
        match self {
            Self::Host(_) => None,
            Self::Port(_, port) => Some(*port),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(target) => write!(f, "{}", target.ip),
            Self::Port(target, port) => match target.ip {
                std::net::IpAddr::V4(ip) => write!(f, "{ip}:{port}"),
                std::net::IpAddr::V6(ip) => write!(f, "[{ip}]:{port}"),
            },
        }
    }
}

/// Result of probing a single work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    /// Host that was probed.
    pub target: Target,
    /// Port that was probed, absent for host discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
    /// Classification of the probe.
    pub status: ProbeStatus,
    /// Time spent on the probe.
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    /// Human-readable failure detail for `error` outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProbeOutcome {
    /// Create an outcome for the given work item.
    pub fn new(item: &WorkItem, status: ProbeStatus, latency: Duration) -> Self {
        Self {
            target: item.target().clone(),
            port: item.port(),
            status,
            latency,
            detail: None,
        }
    }

    /// Create an `error` outcome carrying a detail message.
    pub fn error(item: &WorkItem, latency: Duration, detail: impl Into<String>) -> Self {
        Self::new(item, ProbeStatus::Error, latency).with_detail(detail)
    }

    /// Attach a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Whether the probed endpoint answered at all (accepted or refused).
    pub fn is_responsive(&self) -> bool {
        matches!(self.status, ProbeStatus::Open | ProbeStatus::Closed)
    }
}

pub(crate) fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Executes a single probe.
///
/// Implementations are invoked concurrently from many tasks and must not
/// share mutable state between calls. A probe must finish within roughly
/// `timeout` and release any connection it opened before returning.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Probe one work item.
    async fn probe(&self, item: &WorkItem, timeout: Duration) -> ProbeOutcome;

    /// Longest time a probe of `item` may legitimately take when each
    /// connection attempt is bounded by `timeout`.
    fn time_budget(&self, _item: &WorkItem, timeout: Duration) -> Duration {
        timeout
    }
}
