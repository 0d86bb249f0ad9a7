//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` and `PortSpec` handle range expressions such as
//! `"22,80-100,443"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(u32::from(value)))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u32),
    #[error("invalid port number: '{0}'")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a new port range.
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Get the number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A port specification made of one or more ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000"
/// - Mixed: "22,80,443,8000-9000"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// Create an empty port specification.
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Add a port range to the specification.
    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    /// Add a single port to the specification.
    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// Get all ports as a sorted, deduplicated vector.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut ports: Vec<Port> = self.ranges.iter().flat_map(|r| r.iter()).collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut spec = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            match part.split_once('-') {
                Some((start, end)) => {
                    let range = PortRange::new(parse_port(start)?, parse_port(end)?)?;
                    spec.add_range(range);
                }
                None => spec.add_port(parse_port(part)?),
            }
        }

        Ok(spec)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse a single port token. Values are read as `u32` first so that
/// `70000` reports as out of range rather than as a format error.
fn parse_port(token: &str) -> Result<Port, PortError> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PortError::InvalidFormat(token.to_string()));
    }
    let value: u32 = token
        .parse()
        .map_err(|_| PortError::InvalidFormat(token.to_string()))?;
    u16::try_from(value)
        .ok()
        .and_then(Port::new)
        .ok_or(PortError::OutOfRange(value))
}

/// Parse a port range expression into a sorted, deduplicated port list.
pub fn parse_ports(spec: &str) -> Result<Vec<Port>, PortError> {
    Ok(spec.parse::<PortSpec>()?.to_ports())
}

/// Render a sorted port list back into the range grammar accepted by
/// [`parse_ports`], collapsing consecutive runs.
pub fn format_ports(ports: &[Port]) -> String {
    let mut spec = PortSpec::new();
    let mut iter = ports.iter().copied();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let (mut start, mut end) = (first, first);
    for port in iter {
        if u32::from(port.0) == u32::from(end.0) + 1 {
            end = port;
        } else {
            spec.add_range(PortRange { start, end });
            start = port;
            end = port;
        }
    }
    spec.add_range(PortRange { start, end });
    spec.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(values: &[u16]) -> Vec<Port> {
        values.iter().map(|&p| Port::new(p).unwrap()).collect()
    }

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
    }

    #[test]
    fn test_port_range() {
        let range = PortRange::new(Port::new(1).unwrap(), Port::new(100).unwrap()).unwrap();
        assert_eq!(range.len(), 100);
        assert!(PortRange::new(Port::new(10).unwrap(), Port::new(5).unwrap()).is_err());
    }

    #[test]
    fn test_parse_ports() {
        assert_eq!(parse_ports("80").unwrap(), ports(&[80]));
        assert_eq!(parse_ports("1-100").unwrap().len(), 100);
        assert_eq!(
            parse_ports("22,80-82,443").unwrap(),
            ports(&[22, 80, 81, 82, 443])
        );
        assert_eq!(parse_ports(" 443 , 22 ").unwrap(), ports(&[22, 443]));
    }

    #[test]
    fn test_parse_ports_dedup_and_sort() {
        assert_eq!(
            parse_ports("443,80,80,75-85,22").unwrap(),
            ports(&[22, 75, 76, 77, 78, 79, 80, 81, 82, 83, 84, 85, 443])
        );
    }

    #[test]
    fn test_parse_ports_rejects_malformed() {
        assert!(matches!(parse_ports("abc"), Err(PortError::InvalidFormat(_))));
        assert_eq!(parse_ports("500-10"), Err(PortError::InvalidRange(500, 10)));
        assert_eq!(parse_ports("0-100"), Err(PortError::OutOfRange(0)));
        assert_eq!(parse_ports("70000"), Err(PortError::OutOfRange(70000)));
        assert_eq!(parse_ports(""), Err(PortError::Empty));
        assert!(matches!(parse_ports("22,,80"), Err(PortError::InvalidFormat(_))));
        assert!(matches!(parse_ports("1-2-3"), Err(PortError::InvalidFormat(_))));
        assert!(matches!(parse_ports("-5"), Err(PortError::InvalidFormat(_))));
        assert!(matches!(parse_ports("+5"), Err(PortError::InvalidFormat(_))));
    }

    #[test]
    fn test_format_ports_collapses_runs() {
        assert_eq!(format_ports(&ports(&[20, 21, 22, 80])), "20-22,80");
        assert_eq!(format_ports(&ports(&[65534, 65535])), "65534-65535");
        assert_eq!(format_ports(&[]), "");
    }

    #[test]
    fn test_parse_is_idempotent() {
        for input in ["20-22,80", "1-1000", "443,22,8080-8090,22", "65535"] {
            let parsed = parse_ports(input).unwrap();
            assert_eq!(parse_ports(&format_ports(&parsed)).unwrap(), parsed);
        }
    }

    #[test]
    fn test_port_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Port>("0").is_err());
        assert_eq!(serde_json::from_str::<Port>("22").unwrap().as_u16(), 22);
    }
}
