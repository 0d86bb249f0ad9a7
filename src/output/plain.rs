//! Plain text output formatting.
//!
//! Produces human-readable output, styled when writing to a terminal.

use super::RenderOptions;
use crate::report::ScanReport;
use crate::scanner::{ProbeOutcome, ProbeStatus, ScanMode};
use crate::services::service_label;
use console::{style, Style, StyledObject};
use std::io::{self, Write};

const RULE_WIDTH: usize = 60;

/// Heading printed above a report.
pub fn report_title(mode: ScanMode) -> &'static str {
    match mode {
        ScanMode::NetworkDiscovery => "Network Scan Results",
        ScanMode::PortScan => "Port Scan Results",
    }
}

/// Write the report as an aligned text table.
///
/// Closed and filtered rows are left out unless `show_all` is set; errors
/// are always listed.
pub fn write_plain<W: Write>(
    report: &ScanReport,
    options: RenderOptions,
    out: &mut W,
) -> io::Result<()> {
    let paint = |s: StyledObject<String>| s.force_styling(options.color).to_string();
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out)?;
    writeln!(out, "{}", paint(style(rule.clone()).cyan()))?;
    writeln!(out, "{}", paint(style(report_title(report.mode).to_string()).bold()))?;
    writeln!(out, "{}", paint(style(rule.clone()).cyan()))?;
    writeln!(out)?;

    writeln!(out, "  {:<10} {}", "Target:", report.target)?;
    writeln!(out, "  {:<10} {}", "Mode:", report.mode)?;
    if let Some(started_at) = report.started_at {
        writeln!(out, "  {:<10} {}", "Started:", started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    writeln!(
        out,
        "  {:<10} {:.2}s, {} of {} probed",
        "Elapsed:",
        report.elapsed.as_secs_f64(),
        report.summary.total(),
        report.requested
    )?;
    writeln!(
        out,
        "  {:<10} {} open, {} closed, {} filtered, {} error",
        "Summary:",
        paint(style(report.summary.open.to_string()).green().bold()),
        report.summary.closed,
        report.summary.filtered,
        paint(style(report.summary.error.to_string()).red())
    )?;
    if report.truncated {
        writeln!(
            out,
            "  {} scan stopped early, {} work items were not probed",
            paint(style("Warning:".to_string()).yellow().bold()),
            report.skipped()
        )?;
    }
    writeln!(out)?;

    let rows: Vec<&ProbeOutcome> = report
        .outcomes
        .iter()
        .filter(|o| options.show_all || is_notable(report.mode, o))
        .collect();

    if rows.is_empty() {
        writeln!(out, "  {}", paint(style("Nothing to display.".to_string()).dim()))?;
        writeln!(out)?;
        return Ok(());
    }

    let thin = "-".repeat(RULE_WIDTH - 2);
    match report.mode {
        ScanMode::PortScan => {
            writeln!(
                out,
                "  {:>6}  {:<9} {:<14} {:>8}  DETAIL",
                "PORT", "STATE", "SERVICE", "LATENCY"
            )?;
            writeln!(out, "  {thin}")?;
            for outcome in rows {
                let port = outcome.port.map(|p| p.as_u16()).unwrap_or_default();
                let state = format!("{:<9}", outcome.status.to_string());
                writeln!(
                    out,
                    "  {:>6}  {} {:<14} {:>6}ms  {}",
                    port,
                    paint(status_style(outcome.status).apply_to(state)),
                    service_label(port),
                    outcome.latency.as_millis(),
                    outcome.detail.as_deref().unwrap_or("")
                )?;
            }
        }
        ScanMode::NetworkDiscovery => {
            writeln!(out, "  {:<39} {:<9} {:>8}  DETAIL", "HOST", "STATE", "LATENCY")?;
            writeln!(out, "  {thin}")?;
            for outcome in rows {
                let state = if outcome.is_responsive() {
                    "up".to_string()
                } else {
                    outcome.status.to_string()
                };
                writeln!(
                    out,
                    "  {:<39} {} {:>6}ms  {}",
                    outcome.target.ip,
                    paint(status_style(outcome.status).apply_to(format!("{state:<9}"))),
                    outcome.latency.as_millis(),
                    outcome.detail.as_deref().unwrap_or("")
                )?;
            }
        }
    }
    writeln!(out)?;

    Ok(())
}

/// Rows shown without `show_all`: open ports, live hosts and errors.
fn is_notable(mode: ScanMode, outcome: &ProbeOutcome) -> bool {
    match outcome.status {
        ProbeStatus::Open | ProbeStatus::Error => true,
        ProbeStatus::Closed => mode == ScanMode::NetworkDiscovery,
        ProbeStatus::Filtered => false,
    }
}

fn status_style(status: ProbeStatus) -> Style {
    match status {
        ProbeStatus::Open => Style::new().green().bold(),
        ProbeStatus::Closed => Style::new().red(),
        ProbeStatus::Filtered => Style::new().yellow(),
        ProbeStatus::Error => Style::new().magenta(),
    }
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate;
    use crate::scanner::WorkItem;
    use crate::types::{Port, Target};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn render(report: &ScanReport, show_all: bool) -> String {
        let mut buf = Vec::new();
        let options = RenderOptions {
            show_all,
            color: false,
        };
        write_plain(report, options, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn port_report(truncated: bool) -> ScanReport {
        let target = Target::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let outcomes = [
            (22, ProbeStatus::Open),
            (23, ProbeStatus::Closed),
            (25, ProbeStatus::Error),
        ]
        .into_iter()
            .map(|(port, status)| {
                let item = WorkItem::Port(target.clone(), Port::new(port).unwrap());
                ProbeOutcome::new(&item, status, Duration::from_millis(4))
            })
            .collect();
        aggregate(
            "127.0.0.1",
            outcomes,
            ScanMode::PortScan,
            Duration::from_millis(40),
            truncated,
            5,
        )
    }

    #[test]
    fn test_plain_hides_closed_by_default() {
        let text = render(&port_report(false), false);
        assert!(text.contains("Port Scan Results"));
        assert!(text.contains("1 open, 1 closed, 0 filtered, 1 error"));
        assert!(text.contains("ssh"));
        assert!(!text.contains("telnet"));
        assert!(text.contains("smtp"));
        assert!(!text.contains("Warning:"));
    }

    #[test]
    fn test_plain_show_all_and_truncation() {
        let text = render(&port_report(true), true);
        assert!(text.contains("telnet"));
        assert!(text.contains("2 work items were not probed"));
    }

    #[test]
    fn test_plain_discovery_lists_live_hosts() {
        let outcomes = vec![
            ProbeOutcome::new(
                &WorkItem::Host(Target::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))),
                ProbeStatus::Closed,
                Duration::from_millis(2),
            ),
            ProbeOutcome::new(
                &WorkItem::Host(Target::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)))),
                ProbeStatus::Filtered,
                Duration::from_millis(2),
            ),
        ];
        let report = aggregate(
            "10.0.0.0/30",
            outcomes,
            ScanMode::NetworkDiscovery,
            Duration::ZERO,
            false,
            2,
        );

        let text = render(&report, false);
        assert!(text.contains("Network Scan Results"));
        assert!(text.contains("10.0.0.1"));
        assert!(text.contains("up"));
        assert!(!text.contains("10.0.0.2 "));
    }
}
