//! Scan settings and their on-disk location.
//!
//! Settings are read from a JSON file in the XDG configuration directory
//! (or an explicit path) and every key falls back to its default.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{ScanOptions, DEFAULT_DISCOVERY_PORTS};
use crate::types::Port;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/netrecon)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the configuration directory. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "netrecon", "netrecon")
            .ok_or(ConfigError::DirectoryNotFound)?;
        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Concurrency cap; `None` scales with the work size.
    pub max_concurrency: Option<usize>,
    /// Per-probe connect timeout in milliseconds.
    pub per_probe_timeout_ms: u64,
    /// Overall scan deadline in seconds; `None` is unbounded.
    pub overall_deadline_secs: Option<u64>,
    /// Keep network and broadcast addresses when expanding IPv4 ranges.
    pub include_network_broadcast_addresses: bool,
    /// Ports tried, in order, to decide whether a host is alive.
    pub discovery_ports: Vec<u16>,
    /// Hostname lookup timeout in milliseconds.
    pub dns_timeout_ms: u64,
    /// Probes started per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Port range used when none is given.
    pub default_ports: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            per_probe_timeout_ms: 2000,
            overall_deadline_secs: None,
            include_network_broadcast_addresses: false,
            discovery_ports: DEFAULT_DISCOVERY_PORTS.to_vec(),
            dns_timeout_ms: 5000,
            rate_limit: 0,
            default_ports: "1-1000".to_string(),
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one, the default settings file
    /// is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_discovered(Paths::discover()),
        }
    }

    /// Load from the discovered settings location. A missing configuration
    /// directory is treated like a missing file.
    fn load_discovered(paths: ConfigResult<Paths>) -> ConfigResult<Self> {
        let paths = match paths {
            Ok(paths) => paths,
            Err(e) => {
                tracing::debug!(error = %e, "no configuration directory, using defaults");
                return Ok(Self::default());
            }
        };

        let file = paths.settings_file();
        if file.exists() {
            Self::load_from(&file)
        } else {
            tracing::debug!(path = %file.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Reject values no scan can run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == Some(0) {
            return Err(invalid("max_concurrency", "must be greater than zero"));
        }
        if self.per_probe_timeout_ms == 0 {
            return Err(invalid("per_probe_timeout_ms", "must be greater than zero"));
        }
        if self.dns_timeout_ms == 0 {
            return Err(invalid("dns_timeout_ms", "must be greater than zero"));
        }
        if self.overall_deadline_secs == Some(0) {
            return Err(invalid("overall_deadline_secs", "must be greater than zero"));
        }
        if self.discovery_ports.is_empty() {
            return Err(invalid("discovery_ports", "must list at least one port"));
        }
        if self.discovery_ports.contains(&0) {
            return Err(invalid("discovery_ports", "port 0 is not a valid port"));
        }
        Ok(())
    }

    /// Scheduler options derived from these settings.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_concurrency: self.max_concurrency,
            per_probe_timeout: Duration::from_millis(self.per_probe_timeout_ms),
            overall_deadline: self.overall_deadline_secs.map(Duration::from_secs),
            rate_limit: self.rate_limit,
        }
    }

    /// Discovery ports as validated ports, invalid entries dropped.
    pub fn discovery_ports(&self) -> Vec<Port> {
        self.discovery_ports
            .iter()
            .filter_map(|&p| Port::new(p))
            .collect()
    }

    /// Hostname lookup timeout.
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}
