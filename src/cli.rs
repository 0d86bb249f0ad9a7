//! Command-line interface for netrecon.
//!
//! Uses `clap` derive macros for declarative argument parsing. Flags
//! override values from the settings file.

use crate::config::Settings;
use crate::output::{self, OutputFormat, RenderOptions};
use crate::report::ScanReport;
use crate::scanner::{Engine, ProbeStatus};
use crate::types::parse_ports;
use anyhow::Context;
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Host discovery and TCP connect port scanning.
#[derive(Parser, Debug)]
#[command(name = "netrecon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover live hosts and enumerate open ports", long_about = None)]
#[command(after_help = concat!(
    "Examples:\n",
    "  netrecon --scan-network 192.168.1.0/24\n",
    "  netrecon --port-scan example.com --ports 1-1000",
))]
#[command(group(ArgGroup::new("mode").required(true).args(["scan_network", "port_scan"])))]
pub struct Cli {
    /// Perform network discovery scan on the specified CIDR range
    #[arg(long, value_name = "CIDR")]
    pub scan_network: Option<String>,

    /// Perform port scanning on the target host
    #[arg(long, value_name = "TARGET")]
    pub port_scan: Option<String>,

    /// Port range to scan (e.g. "1-1000", "22,80,443", "22,80-100,443")
    #[arg(short, long, value_name = "RANGE")]
    pub ports: Option<String>,

    /// Maximum number of concurrent probes (capped at 500)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Per-probe connection timeout in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Stop admitting new probes after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Include network and broadcast addresses in network scans
    #[arg(long)]
    pub include_broadcast: bool,

    /// Ports tried to decide whether a host is alive
    #[arg(long, value_name = "RANGE")]
    pub discovery_ports: Option<String>,

    /// Probes started per second (0 = unlimited)
    #[arg(short = 'r', long = "rate")]
    pub rate_limit: Option<u32>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    /// Output file for results
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// List closed and filtered results too
    #[arg(long)]
    pub show_all: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "FILE", env = "NETRECON_CONFIG")]
    pub config: Option<PathBuf>,
}

/// How a command invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The scan ran to completion (or its deadline).
    Finished,
    /// The operator interrupted the scan; partial results were reported.
    Interrupted,
}

impl Cli {
    /// Resolve effective settings: file, then command-line overrides.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;

        if let Some(concurrency) = self.concurrency {
            settings.max_concurrency = Some(concurrency);
        }
        if let Some(timeout) = self.timeout {
            settings.per_probe_timeout_ms = timeout;
        }
        if let Some(deadline) = self.deadline {
            settings.overall_deadline_secs = Some(deadline);
        }
        if self.include_broadcast {
            settings.include_network_broadcast_addresses = true;
        }
        if let Some(spec) = &self.discovery_ports {
            let ports = parse_ports(spec).context("invalid --discovery-ports")?;
            settings.discovery_ports = ports.iter().map(|p| p.as_u16()).collect();
        }
        if let Some(rate) = self.rate_limit {
            settings.rate_limit = rate;
        }
        if let Some(ports) = &self.ports {
            settings.default_ports = ports.clone();
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Run the selected scan and render its report.
    pub async fn execute(&self) -> anyhow::Result<Completion> {
        let settings = self.settings()?;
        let progress = self.progress_bar()?;

        let mut engine = Engine::new(settings);
        if let Some(pb) = &progress {
            let pb = pb.clone();
            engine = engine.with_observer(move |outcome| {
                pb.inc(1);
                if outcome.status == ProbeStatus::Open {
                    match outcome.port {
                        Some(port) => pb.set_message(format!("found open port {port}")),
                        None => pb.set_message(format!("found host {}", outcome.target.ip)),
                    }
                }
            });
        }

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let report = match (&self.scan_network, &self.port_scan) {
            (Some(cidr), _) => {
                info!("Starting network scan on {cidr}");
                engine.network_scan(cidr, &cancel).await?
            }
            (None, Some(target)) => {
                let ports = &engine.settings().default_ports;
                info!("Starting port scan on {target} ({})", ports);
                engine.port_scan(target, ports, &cancel).await?
            }
            (None, None) => anyhow::bail!("either --scan-network or --port-scan is required"),
        };

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        self.emit(&report)?;

        if cancel.is_cancelled() {
            output::print_warning("scan interrupted, results are partial");
            Ok(Completion::Interrupted)
        } else {
            Ok(Completion::Finished)
        }
    }

    fn progress_bar(&self) -> anyhow::Result<Option<ProgressBar>> {
        if self.quiet || self.format != OutputFormat::Plain || !console::Term::stderr().is_term() {
            return Ok(None);
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {pos} probes complete {msg}",
        )?);
        pb.enable_steady_tick(Duration::from_millis(120));
        Ok(Some(pb))
    }

    /// Print the report and write the optional output file.
    fn emit(&self, report: &ScanReport) -> anyhow::Result<()> {
        let options = RenderOptions {
            show_all: self.show_all,
            color: console::colors_enabled(),
        };
        let stdout = io::stdout();
        let mut out = stdout.lock();
        output::write_report(report, self.format, options, &mut out)?;
        out.flush()?;

        if let Some(path) = &self.output {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let plain = RenderOptions {
                color: false,
                ..options
            };
            output::write_report(report, self.format, plain, &mut writer)?;
            writer.flush()?;
            if !self.quiet {
                eprintln!("Results saved to {}", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write as _;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mode_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["netrecon"]).is_err());
        assert!(Cli::try_parse_from([
            "netrecon",
            "--scan-network",
            "10.0.0.0/30",
            "--port-scan",
            "10.0.0.1"
        ])
        .is_err());
        let cli = Cli::try_parse_from(["netrecon", "--port-scan", "example.com"]).unwrap();
        assert_eq!(cli.port_scan.as_deref(), Some("example.com"));
        assert_eq!(cli.format, OutputFormat::Plain);
    }

    #[test]
    fn test_flags_override_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "per_probe_timeout_ms": 750, "max_concurrency": 10 }}"#).unwrap();
        let config = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "netrecon",
            "--port-scan",
            "127.0.0.1",
            "--config",
            config.as_str(),
            "-c",
            "40",
            "--deadline",
            "9",
            "--discovery-ports",
            "443,22",
        ])
        .unwrap();
        let settings = cli.settings().unwrap();

        assert_eq!(settings.per_probe_timeout_ms, 750);
        assert_eq!(settings.max_concurrency, Some(40));
        assert_eq!(settings.overall_deadline_secs, Some(9));
        assert_eq!(settings.discovery_ports, vec![22, 443]);
        assert_eq!(settings.default_ports, "1-1000");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::try_parse_from(["netrecon", "--port-scan", "127.0.0.1", "-t", "0"]).unwrap();
        assert!(cli.settings().is_err());
    }
}
