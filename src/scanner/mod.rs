//! Scanner module - ties the pieces of a scan together.
//!
//! Input is resolved and validated first, then the [`Scheduler`] drives a
//! [`Prober`] over the work set, and the outcomes are aggregated into a
//! [`ScanReport`]. Input errors surface before any probe is launched.

pub mod rate_limiter;
pub mod scheduler;
pub mod tcp;
pub mod traits;

use crate::config::Settings;
use crate::error::ScanResult;
use crate::report::{aggregate, ScanReport};
use crate::types::{expand_network, parse_ports, resolve_host};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use scheduler::{
    Observer, ScanOptions, ScheduleResult, Scheduler, DEFAULT_PROBE_TIMEOUT, MAX_CONCURRENCY,
};
pub use tcp::{TcpProber, DEFAULT_DISCOVERY_PORTS};
pub use traits::{ProbeOutcome, ProbeStatus, Prober, ScanMode, WorkItem};

/// Runs network discovery and port scans with a fixed set of settings.
pub struct Engine<P = TcpProber> {
    settings: Settings,
    prober: Arc<P>,
    observer: Option<Observer>,
}

impl Engine<TcpProber> {
    /// Create an engine that probes with TCP connect.
    pub fn new(settings: Settings) -> Self {
        let prober = TcpProber::new(settings.discovery_ports());
        Self::with_prober(settings, prober)
    }
}

impl<P: Prober> Engine<P> {
    /// Create an engine around any prober.
    pub fn with_prober(settings: Settings, prober: P) -> Self {
        Self {
            settings,
            prober: Arc::new(prober),
            observer: None,
        }
    }

    /// Call `observer` with every outcome as it completes.
    pub fn with_observer(
        mut self,
        observer: impl Fn(&ProbeOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// The settings this engine runs with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sweep a CIDR range for live hosts.
    pub async fn network_scan(
        &self,
        cidr: &str,
        cancel: &CancellationToken,
    ) -> ScanResult<ScanReport> {
        let hosts = expand_network(cidr, self.settings.include_network_broadcast_addresses)?;
        info!(network = cidr, hosts = hosts.len(), "starting network discovery");

        let items = hosts.into_iter().map(WorkItem::Host);
        Ok(self.execute(cidr, ScanMode::NetworkDiscovery, items, cancel).await)
    }

    /// Enumerate ports on a single host.
    pub async fn port_scan(
        &self,
        target: &str,
        ports: &str,
        cancel: &CancellationToken,
    ) -> ScanResult<ScanReport> {
        let ports = parse_ports(ports)?;
        let target = resolve_host(target, self.settings.dns_timeout()).await?;
        info!(target = %target, ports = ports.len(), "starting port scan");

        let items = ports
            .into_iter()
            .map(|port| WorkItem::Port(target.clone(), port));
        Ok(self
            .execute(&target.to_string(), ScanMode::PortScan, items, cancel)
            .await)
    }

    async fn execute<I>(
        &self,
        description: &str,
        mode: ScanMode,
        items: I,
        cancel: &CancellationToken,
    ) -> ScanReport
    where
        I: IntoIterator<Item = WorkItem>,
        I::IntoIter: ExactSizeIterator,
    {
        let started_at = Utc::now();
        let mut scheduler = Scheduler::new(Arc::clone(&self.prober), self.settings.scan_options());
        if let Some(observer) = &self.observer {
            scheduler = scheduler.with_shared_observer(Arc::clone(observer));
        }

        let run = scheduler.run(items, cancel).await;
        let report = aggregate(
            description,
            run.outcomes,
            mode,
            run.elapsed,
            run.truncated,
            run.requested,
        )
        .with_started_at(started_at);

        info!(
            %mode,
            open = report.summary.open,
            closed = report.summary.closed,
            filtered = report.summary.filtered,
            errors = report.summary.error,
            truncated = report.truncated,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scan finished"
        );
        report
    }
}

impl<P> fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::report::ScanSummary;
    use crate::types::Port;
    use async_trait::async_trait;
    use rand::Rng;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Port 22 is open, everything else refuses; completion order is random.
    #[derive(Default)]
    struct SshOnlyProber {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prober for SshOnlyProber {
        async fn probe(&self, item: &WorkItem, _timeout: Duration) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = rand::thread_rng().gen_range(0..20);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let status = match item.port().map(Port::as_u16) {
                Some(22) | None => ProbeStatus::Open,
                Some(_) => ProbeStatus::Closed,
            };
            ProbeOutcome::new(item, status, Duration::from_millis(delay))
        }
    }

    #[tokio::test]
    async fn test_port_scan_end_to_end() {
        let engine = Engine::with_prober(Settings::default(), SshOnlyProber::default());

        let report = engine
            .port_scan("127.0.0.1", "20-22,80", &CancellationToken::new())
            .await
            .unwrap();

        let ports: Vec<(u16, ProbeStatus)> = report
            .outcomes
            .iter()
            .map(|o| (o.port.unwrap().as_u16(), o.status))
            .collect();
        assert_eq!(
            ports,
            vec![
                (20, ProbeStatus::Closed),
                (21, ProbeStatus::Closed),
                (22, ProbeStatus::Open),
                (80, ProbeStatus::Closed),
            ]
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
        assert_eq!(report.mode, ScanMode::PortScan);
        assert!(!report.truncated);
        assert!(report.started_at.is_some());
    }

    #[tokio::test]
    async fn test_report_order_ignores_completion_order() {
        let engine = Engine::with_prober(
            Settings {
                max_concurrency: Some(50),
                ..Settings::default()
            },
            SshOnlyProber::default(),
        );

        let report = engine
            .port_scan("127.0.0.1", "1-300", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 300);
        assert!(report
            .outcomes
            .windows(2)
            .all(|w| w[0].port < w[1].port));
    }

    #[tokio::test]
    async fn test_network_scan_end_to_end() {
        let engine = Engine::with_prober(Settings::default(), SshOnlyProber::default());

        let report = engine
            .network_scan("10.0.0.0/30", &CancellationToken::new())
            .await
            .unwrap();

        let hosts: Vec<IpAddr> = report.outcomes.iter().map(|o| o.target.ip).collect();
        assert_eq!(
            hosts,
            vec![
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            ]
        );
        assert_eq!(report.mode, ScanMode::NetworkDiscovery);
        assert_eq!(report.target, "10.0.0.0/30");
        assert_eq!(report.responsive_hosts().len(), 2);
    }

    #[tokio::test]
    async fn test_input_errors_launch_no_probes() {
        let engine = Engine::with_prober(Settings::default(), SshOnlyProber::default());
        let cancel = CancellationToken::new();

        let err = engine.port_scan("127.0.0.1", "500-10", &cancel).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidPortRange(_)));

        let err = engine.network_scan("300.1.1.0/24", &cancel).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidTarget(_)));

        let err = engine.port_scan("bad_host!", "80", &cancel).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidTarget(_)));

        assert_eq!(engine.prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tcp_port_scan_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = {
            let spare = TcpListener::bind("127.0.0.1:0").await.unwrap();
            spare.local_addr().unwrap().port()
        };

        let engine = Engine::new(Settings {
            per_probe_timeout_ms: 1000,
            ..Settings::default()
        });
        let report = engine
            .port_scan("127.0.0.1", &format!("{open},{closed}"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.summary.open, 1);
        assert_eq!(report.summary.closed, 1);
        let open_ports: Vec<u16> = report
            .open_outcomes()
            .filter_map(|o| o.port.map(Port::as_u16))
            .collect();
        assert_eq!(open_ports, vec![open]);
    }

    #[tokio::test]
    async fn test_observer_is_wired_through() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let engine = Engine::with_prober(Settings::default(), SshOnlyProber::default())
            .with_observer(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        engine
            .port_scan("127.0.0.1", "20-29", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }
}
