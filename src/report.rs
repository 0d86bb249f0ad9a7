//! Scan report aggregation.
//!
//! Turns the unordered outcomes of a scheduler run into an immutable report
//! ordered by `(address, port)` with per-status counts.

use crate::scanner::traits::{serialize_millis, ProbeOutcome, ProbeStatus, ScanMode};
use crate::types::Target;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    pub error: usize,
}

impl ScanSummary {
    /// Count outcomes by status.
    pub fn from_outcomes(outcomes: &[ProbeOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            match outcome.status {
                ProbeStatus::Open => summary.open += 1,
                ProbeStatus::Closed => summary.closed += 1,
                ProbeStatus::Filtered => summary.filtered += 1,
                ProbeStatus::Error => summary.error += 1,
            }
            summary
        })
    }

    /// Total number of outcomes counted.
    pub fn total(&self) -> usize {
        self.open + self.closed + self.filtered + self.error
    }
}

/// The result of one scan invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// What was scanned, as the caller named it.
    pub target: String,
    pub mode: ScanMode,
    /// When the scan started, if the caller stamped it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Number of work items requested.
    pub requested: usize,
    pub summary: ScanSummary,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Set when the run ended before every work item was probed.
    pub truncated: bool,
    /// Outcomes sorted by address, then port.
    pub outcomes: Vec<ProbeOutcome>,
}

impl ScanReport {
    /// Stamp the wall-clock start time.
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Outcomes whose status is `open`.
    pub fn open_outcomes(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ProbeStatus::Open)
    }

    /// Hosts that answered at least one probe, in report order.
    pub fn responsive_hosts(&self) -> Vec<&Target> {
        let mut hosts: Vec<&Target> = self
            .outcomes
            .iter()
            .filter(|o| o.is_responsive())
            .map(|o| &o.target)
            .collect();
        hosts.dedup_by(|a, b| a.ip == b.ip);
        hosts
    }

    /// Number of requested work items with no outcome.
    pub fn skipped(&self) -> usize {
        self.requested.saturating_sub(self.outcomes.len())
    }
}

/// Build a report from raw outcomes.
///
/// Pure: sorts by `(ip, port)` (host outcomes, which carry no port, sort
/// before any port of the same host) and counts statuses.
pub fn aggregate(
    target: impl Into<String>,
    mut outcomes: Vec<ProbeOutcome>,
    mode: ScanMode,
    elapsed: Duration,
    truncated: bool,
    requested: usize,
) -> ScanReport {
    outcomes.sort_by(|a, b| (a.target.ip, a.port).cmp(&(b.target.ip, b.port)));
    let summary = ScanSummary::from_outcomes(&outcomes);

    ScanReport {
        target: target.into(),
        mode,
        started_at: None,
        requested,
        summary,
        elapsed,
        truncated,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::WorkItem;
    use crate::types::Port;
    use rand::seq::SliceRandom;
    use std::net::{IpAddr, Ipv4Addr};

    fn host(last: u8) -> Target {
        Target::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)))
    }

    fn outcome(last: u8, port: u16, status: ProbeStatus) -> ProbeOutcome {
        let item = WorkItem::Port(host(last), Port::new(port).unwrap());
        ProbeOutcome::new(&item, status, Duration::from_millis(1))
    }

    #[test]
    fn test_aggregate_sorts_by_address_then_port() {
        let mut outcomes = vec![
            outcome(10, 22, ProbeStatus::Open),
            outcome(9, 443, ProbeStatus::Closed),
            outcome(9, 80, ProbeStatus::Filtered),
            outcome(10, 21, ProbeStatus::Error),
            outcome(2, 65535, ProbeStatus::Closed),
        ];
        outcomes.shuffle(&mut rand::thread_rng());

        let report =
            aggregate("10.0.0.0/28", outcomes, ScanMode::PortScan, Duration::ZERO, false, 5);

        let order: Vec<(u8, u16)> = report
            .outcomes
            .iter()
            .map(|o| match o.target.ip {
                IpAddr::V4(ip) => (ip.octets()[3], o.port.unwrap().as_u16()),
                IpAddr::V6(_) => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![(2, 65535), (9, 80), (9, 443), (10, 21), (10, 22)]);
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            outcome(1, 20, ProbeStatus::Closed),
            outcome(1, 21, ProbeStatus::Closed),
            outcome(1, 22, ProbeStatus::Open),
            outcome(1, 80, ProbeStatus::Closed),
        ];
        let report = aggregate(
            "10.0.0.1",
            outcomes,
            ScanMode::PortScan,
            Duration::from_secs(1),
            false,
            4,
        );

        assert_eq!(
            report.summary,
            ScanSummary {
                open: 1,
                closed: 3,
                filtered: 0,
                error: 0
            }
        );
        assert_eq!(report.summary.total(), 4);
        assert_eq!(report.open_outcomes().count(), 1);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn test_responsive_hosts() {
        let outcomes = vec![
            ProbeOutcome::new(&WorkItem::Host(host(3)), ProbeStatus::Open, Duration::ZERO),
            ProbeOutcome::new(&WorkItem::Host(host(1)), ProbeStatus::Closed, Duration::ZERO),
            ProbeOutcome::new(&WorkItem::Host(host(2)), ProbeStatus::Filtered, Duration::ZERO),
        ];
        let report = aggregate(
            "10.0.0.0/29",
            outcomes,
            ScanMode::NetworkDiscovery,
            Duration::ZERO,
            true,
            6,
        );

        let hosts: Vec<IpAddr> = report.responsive_hosts().iter().map(|t| t.ip).collect();
        assert_eq!(hosts, vec![host(1).ip, host(3).ip]);
        assert_eq!(report.skipped(), 3);
    }

    #[test]
    fn test_report_serialization() {
        let report = aggregate(
            "10.0.0.1",
            vec![outcome(1, 22, ProbeStatus::Open)],
            ScanMode::PortScan,
            Duration::from_millis(1500),
            true,
            2,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "port-scan");
        assert_eq!(json["elapsed_ms"], 1500);
        assert_eq!(json["truncated"], true);
        assert_eq!(json["summary"]["open"], 1);
        assert!(json.get("started_at").is_none());
        assert_eq!(json["outcomes"][0]["target"]["ip"], "10.0.0.1");
    }
}
