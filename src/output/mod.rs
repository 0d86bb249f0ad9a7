//! Output formatting module.
//!
//! Renders a [`ScanReport`] as plain text, JSON or CSV into any writer.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::write_csv;
pub use json_format::write_json;
pub use plain::{print_error, print_warning, report_title, write_plain};

use crate::report::ScanReport;
use std::fmt;
use std::io::{self, Write};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Rendering switches for plain output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Include closed and filtered rows.
    pub show_all: bool,
    /// Emit terminal colors.
    pub color: bool,
}

/// Write `report` to `out` in the requested format.
pub fn write_report<W: Write>(
    report: &ScanReport,
    format: OutputFormat,
    options: RenderOptions,
    out: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Plain => write_plain(report, options, out),
        OutputFormat::Json => write_json(report, out),
        OutputFormat::Csv => write_csv(report, out),
    }
}
