//! Core input types: validated ports and resolved targets.
//!
//! Parsing and resolution happen here, before any probe is launched, so
//! malformed input never reaches the scheduler.

mod port;
mod target;

pub use port::{format_ports, parse_ports, Port, PortError, PortRange, PortSpec};
pub use target::{
    expand_network, resolve_host, ResolutionError, Target, TargetError, MAX_NETWORK_HOSTS,
};
