//! Error types for netrecon.
//!
//! Uses `thiserror` for ergonomic error definitions. Input validation errors
//! live next to the types they validate and are rolled up into [`ScanError`].
//! Per-probe failures are never errors here: they are recorded as
//! [`ProbeStatus::Error`](crate::scanner::ProbeStatus::Error) outcomes.

use crate::types::{PortError, ResolutionError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a scan from starting.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),

    #[error("invalid port range: {0}")]
    InvalidPortRange(#[from] PortError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Errors raised while loading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
