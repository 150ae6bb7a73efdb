//! Collectors module for system metrics.
//!
//! CPU and memory readers live in [`crate::system`]; this module holds the
//! network interface collector.

pub mod netdev;
