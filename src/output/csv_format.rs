//! CSV output formatting.

use crate::report::ScanReport;
use crate::services::service_label;
use std::io::{self, Write};

/// Write one CSV row per outcome.
pub fn write_csv<W: Write>(report: &ScanReport, out: &mut W) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["host", "port", "status", "service", "latency_ms", "detail"])?;

    for outcome in &report.outcomes {
        let (port, service) = match outcome.port {
            Some(port) => (port.to_string(), service_label(port.as_u16())),
            None => (String::new(), ""),
        };
        let host = outcome.target.ip.to_string();
        let status = outcome.status.to_string();
        let latency = outcome.latency.as_millis().to_string();
        wtr.write_record([
            host.as_str(),
            port.as_str(),
            status.as_str(),
            service,
            latency.as_str(),
            outcome.detail.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate;
    use crate::scanner::{ProbeOutcome, ProbeStatus, ScanMode, WorkItem};
    use crate::types::{Port, Target};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    #[test]
    fn test_csv_rows() {
        let target = Target::from_ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
        let item = WorkItem::Port(target, Port::new(22).unwrap());
        let outcomes = vec![
            ProbeOutcome::new(&item, ProbeStatus::Open, Duration::from_millis(3)),
        ];
        let report = aggregate("192.0.2.7", outcomes, ScanMode::PortScan, Duration::ZERO, false, 1);

        let mut buf = Vec::new();
        write_csv(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "host,port,status,service,latency_ms,detail");
        assert_eq!(lines[1], "192.0.2.7,22,open,ssh,3,");
    }
}
