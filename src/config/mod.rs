//! Configuration management for netrecon.
//!
//! Provides XDG-compliant settings lookup and conversion into scheduler
//! options.

mod settings;

pub use settings::{Paths, Settings};
