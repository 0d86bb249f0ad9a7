//! # netrecon - Host Discovery and Port Scanning
//!
//! netrecon sweeps CIDR ranges for live hosts and enumerates open TCP ports
//! on a single target, using connect-style probes under a bounded
//! concurrency cap and an optional overall deadline.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use netrecon::config::Settings;
//! use netrecon::scanner::Engine;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Engine::new(Settings::default());
//!     let report = engine
//!         .port_scan("192.168.1.1", "22,80-100,443", &CancellationToken::new())
//!         .await?;
//!
//!     for outcome in report.open_outcomes() {
//!         println!("{:?} is open", outcome.port);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Port range parsing, CIDR expansion and hostname resolution
//! - [`scanner`] - The probe trait, TCP connect prober, scheduler and engine
//! - [`report`] - Aggregation of outcomes into an ordered report
//! - [`config`] - Settings file handling
//! - [`output`] - Plain, JSON and CSV rendering
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod report;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{ConfigError, ScanError};
pub use report::{aggregate, ScanReport, ScanSummary};
pub use scanner::{
    Engine, ProbeOutcome, ProbeStatus, Prober, ScanMode, ScanOptions, Scheduler, WorkItem,
};
pub use types::{expand_network, parse_ports, resolve_host, Port, Target};
