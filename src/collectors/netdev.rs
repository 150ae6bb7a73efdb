//! Network interface statistics collector.
//!
//! This module reads per-interface counters from /proc/net/dev for the
//! network gauges.

use crate::system::{read_proc_file, SampleError};

/// Network interface statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetDevStats {
    pub bytes_recv: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub errors_out: u64,
}

/// Parses /proc/net/dev content.
///
/// Returns `(interface, stats)` pairs in file order. Malformed lines are skipped.
pub fn parse_netdev_stats(content: &str) -> Result<Vec<(String, NetDevStats)>, SampleError> {
    let mut lines = content.lines();

    // Two header lines precede the interface rows
    let header_ok = lines.next().is_some_and(|l| l.contains("Inter-"))
        && lines.next().is_some_and(|l| l.contains("face"));
    if !header_ok {
        return Err(SampleError::parse("/proc/net/dev", "missing header lines"));
    }

    let mut stats = Vec::new();

    for line in lines {
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = counters
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if values.len() < 16 {
            continue; // Skip malformed lines
        }

        stats.push((
            interface.trim().to_string(),
            NetDevStats {
                bytes_recv: values[0],
                packets_recv: values[1],
                errors_in: values[2],
                bytes_sent: values[8],
                packets_sent: values[9],
                errors_out: values[10],
            },
        ));
    }

    Ok(stats)
}

/// Reads network interface statistics from /proc/net/dev.
pub fn read_netdev_stats() -> Result<Vec<(String, NetDevStats)>, SampleError> {
    parse_netdev_stats(&read_proc_file("/proc/net/dev")?)
}
