//! Target types with CIDR expansion and hostname resolution.
//!
//! Provides:
//! - [`expand_network`]: CIDR range to an ascending list of host targets
//! - [`resolve_host`]: IP literal or hostname to a single target

use crate::error::ScanResult;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::system_conf::read_system_conf;
use trust_dns_resolver::TokioAsyncResolver;

/// A single scan target that has been resolved to an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// The original input (hostname, IP string or CIDR).
    pub original: String,
    /// The resolved IP address.
    pub ip: IpAddr,
}

impl Target {
    /// Create a new target.
    pub fn new(original: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }

    /// A target named by its own address.
    pub fn from_ip(ip: IpAddr) -> Self {
        Self::new(ip.to_string(), ip)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original == self.ip.to_string() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.original, self.ip)
        }
    }
}

/// Error type for malformed targets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: '{0}'")]
    InvalidFormat(String),
    #[error("invalid CIDR notation: '{0}'")]
    InvalidCidr(String),
    #[error("CIDR range too large: {0} addresses (max: {1})")]
    CidrTooLarge(u128, u128),
    #[error("network {0} contains no usable host addresses")]
    NoUsableHosts(String),
}

/// Error type for hostname resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("failed to resolve hostname '{host}': {reason}")]
    LookupFailed { host: String, reason: String },
    #[error("no IP addresses found for hostname '{0}'")]
    NoAddressesFound(String),
    #[error("resolving '{host}' timed out after {timeout_ms}ms")]
    Timeout { host: String, timeout_ms: u128 },
}

/// Maximum number of addresses a network may span.
pub const MAX_NETWORK_HOSTS: u128 = 65536;

/// Expand a CIDR range into its host targets in ascending address order.
///
/// For IPv4 networks wider than /31 the network and broadcast addresses
/// are dropped unless `include_network_broadcast` is set.
pub fn expand_network(
    cidr: &str,
    include_network_broadcast: bool,
) -> Result<Vec<Target>, TargetError> {
    let cidr = cidr.trim();
    if !cidr.contains('/') {
        return Err(TargetError::InvalidCidr(cidr.to_string()));
    }
    let network: IpNetwork = cidr
        .parse()
        .map_err(|_| TargetError::InvalidCidr(cidr.to_string()))?;

    let size = network_size(&network);
    if size > MAX_NETWORK_HOSTS {
        return Err(TargetError::CidrTooLarge(size, MAX_NETWORK_HOSTS));
    }

    let original = network.to_string();
    let targets: Vec<Target> = network
        .iter()
        .filter(|ip| match (network, ip) {
            (IpNetwork::V4(net), IpAddr::V4(addr))
                if net.prefix() < 31 && !include_network_broadcast =>
            {
                *addr != net.network() && *addr != net.broadcast()
            }
            _ => true,
        })
        .map(|ip| Target::new(original.clone(), ip))
        .collect();

    if targets.is_empty() {
        return Err(TargetError::NoUsableHosts(original));
    }
    Ok(targets)
}

/// Number of addresses covered by a network, saturating for huge IPv6 ranges.
fn network_size(network: &IpNetwork) -> u128 {
    let bits = match network {
        IpNetwork::V4(net) => 32 - u32::from(net.prefix()),
        IpNetwork::V6(net) => 128 - u32::from(net.prefix()),
    };
    2u128.checked_pow(bits).unwrap_or(u128::MAX)
}

/// Resolve an IP literal or hostname to a single target.
///
/// IP literals never touch DNS. Hostnames are looked up with the host's
/// resolver configuration (`/etc/resolv.conf` and the hosts file on Unix),
/// bounded by `lookup_timeout`. The first address returned is used.
pub async fn resolve_host(name_or_ip: &str, lookup_timeout: Duration) -> ScanResult<Target> {
    let name = name_or_ip.trim();

    if let Ok(ip) = name.parse::<IpAddr>() {
        return Ok(Target::from_ip(ip));
    }

    if !is_valid_hostname(name) {
        return Err(TargetError::InvalidFormat(name.to_string()).into());
    }

    let (config, opts) = resolver_setup(lookup_timeout);
    let resolver = TokioAsyncResolver::tokio(config, opts);

    let response = tokio::time::timeout(lookup_timeout, resolver.lookup_ip(name))
        .await
        .map_err(|_| ResolutionError::Timeout {
            host: name.to_string(),
            timeout_ms: lookup_timeout.as_millis(),
        })?
        .map_err(|e| ResolutionError::LookupFailed {
            host: name.to_string(),
            reason: e.to_string(),
        })?;

    let ip = response
        .iter()
        .next()
        .ok_or_else(|| ResolutionError::NoAddressesFound(name.to_string()))?;

    tracing::debug!(host = name, %ip, "resolved target");
    Ok(Target::new(name, ip))
}

/// System resolver configuration with the lookup timeout applied. Falls back
/// to the built-in upstream configuration when the system one is unreadable.
fn resolver_setup(lookup_timeout: Duration) -> (ResolverConfig, ResolverOpts) {
    let (config, mut opts) = read_system_conf().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "system resolver configuration unavailable, using defaults");
        (ResolverConfig::default(), ResolverOpts::default())
    });
    opts.timeout = lookup_timeout;
    (config, opts)
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    // Each label must be 1-63 characters, alphanumeric at both ends
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.starts_with(|c: char| c.is_ascii_alphanumeric())
            && label.ends_with(|c: char| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
