//! Domain layer - Collector identifiers and backend ports
//!
//! This module defines the traits (ports) that backend adapters implement.

pub mod ports;

pub use ports::*;
