//! Host statistics read from the /proc filesystem.
//!
//! This module provides the raw readers behind the sampler: per-core CPU time
//! counters from /proc/stat, virtual memory from /proc/meminfo and (through
//! [`crate::collectors::netdev`]) per-interface network counters. Parsers take
//! the file content as a string so they can be tested without a live /proc.

use std::fs;
use std::path::PathBuf;

use crate::collectors::netdev::{self, NetDevStats};

/// Errors produced while sampling host statistics.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {file} format: {reason}")]
    Parse { file: &'static str, reason: String },

    #[error("CPU count changed between samples: {before} -> {after}")]
    CpuCountChanged { before: usize, after: usize },
}

impl SampleError {
    pub(crate) fn parse(file: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse {
            file,
            reason: reason.into(),
        }
    }
}

/// Reads a /proc file into a string, tagging failures with the path.
pub(crate) fn read_proc_file(path: &str) -> Result<String, SampleError> {
    fs::read_to_string(path).map_err(|source| SampleError::Read {
        path: PathBuf::from(path),
        source,
    })
}

/// CPU time counters of a single core, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Non-active time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    pub fn busy(&self) -> u64 {
        self.total().saturating_sub(self.idle_total())
    }
}

/// Virtual memory snapshot in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualMemory {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
}

/// Parses per-core CPU counters from /proc/stat content.
///
/// Only `cpuN` lines are returned, ordered by core index. The aggregate `cpu`
/// line is skipped.
pub fn parse_cpu_stats(content: &str) -> Result<Vec<CpuStat>, SampleError> {
    let mut cores: Vec<(usize, CpuStat)> = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(index) = parts
            .first()
            .and_then(|name| name.strip_prefix("cpu"))
            .filter(|idx| !idx.is_empty())
            .and_then(|idx| idx.parse::<usize>().ok())
        else {
            continue;
        };

        if parts.len() < 8 {
            return Err(SampleError::parse(
                "/proc/stat",
                format!("cpu{} has {} fields, expected at least 8", index, parts.len()),
            ));
        }

        let field = |i: usize| parts.get(i).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);

        cores.push((
            index,
            CpuStat {
                user: field(1),
                nice: field(2),
                system: field(3),
                idle: field(4),
                iowait: field(5),
                irq: field(6),
                softirq: field(7),
                steal: field(8),
            },
        ));
    }

    if cores.is_empty() {
        return Err(SampleError::parse("/proc/stat", "no per-core CPU lines found"));
    }

    cores.sort_by_key(|(index, _)| *index);
    Ok(cores.into_iter().map(|(_, stat)| stat).collect())
}

/// Reads per-core CPU counters from /proc/stat.
pub fn read_cpu_stats() -> Result<Vec<CpuStat>, SampleError> {
    parse_cpu_stats(&read_proc_file("/proc/stat")?)
}

/// Utilization of one core between two snapshots, in percent.
pub fn cpu_percent(previous: &CpuStat, current: &CpuStat) -> f64 {
    let busy_prev = previous.busy();
    let busy_cur = current.busy();
    let total_prev = previous.total();
    let total_cur = current.total();

    if busy_cur <= busy_prev {
        return 0.0;
    }
    if total_cur <= total_prev {
        return 100.0;
    }

    let ratio = (busy_cur - busy_prev) as f64 / (total_cur - total_prev) as f64;
    (ratio * 100.0).clamp(0.0, 100.0)
}

/// Per-core utilization between two snapshots taken over the same cores.
pub fn cpu_percentages(
    previous: &[CpuStat],
    current: &[CpuStat],
) -> Result<Vec<f64>, SampleError> {
    if previous.len() != current.len() {
        return Err(SampleError::CpuCountChanged {
            before: previous.len(),
            after: current.len(),
        });
    }

    Ok(previous
        .iter()
        .zip(current)
        .map(|(prev, cur)| cpu_percent(prev, cur))
        .collect())
}

/// Parses /proc/meminfo content into a [`VirtualMemory`] snapshot.
pub fn parse_memory_info(content: &str) -> Result<VirtualMemory, SampleError> {
    let mut total_bytes: Option<u64> = None;
    let mut available_bytes: Option<u64> = None;

    for line in content.lines() {
        let slot = if line.starts_with("MemTotal:") {
            &mut total_bytes
        } else if line.starts_with("MemAvailable:") {
            &mut available_bytes
        } else {
            continue;
        };

        let kb = line
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| SampleError::parse("/proc/meminfo", format!("bad line '{}'", line)))?;
        *slot = Some(kb * 1024);

        if total_bytes.is_some() && available_bytes.is_some() {
            break;
        }
    }

    match (total_bytes, available_bytes) {
        (Some(total), Some(available)) => Ok(VirtualMemory {
            total_bytes: total,
            available_bytes: available,
            used_bytes: total.saturating_sub(available),
        }),
        _ => Err(SampleError::parse(
            "/proc/meminfo",
            "MemTotal or MemAvailable missing",
        )),
    }
}

/// Reads virtual memory usage from /proc/meminfo.
pub fn read_memory_info() -> Result<VirtualMemory, SampleError> {
    parse_memory_info(&read_proc_file("/proc/meminfo")?)
}

/// Source of host statistics consumed by the sampler.
pub trait SystemSource: Send + Sync + 'static {
    /// Per-core CPU time counters, ordered by core index.
    fn cpu_times(&self) -> Result<Vec<CpuStat>, SampleError>;

    fn virtual_memory(&self) -> Result<VirtualMemory, SampleError>;

    /// Per-interface network counters as `(interface, stats)` pairs.
    fn net_io_counters(&self) -> Result<Vec<(String, NetDevStats)>, SampleError>;
}

/// [`SystemSource`] backed by the live /proc filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcSource;

impl SystemSource for ProcSource {
    fn cpu_times(&self) -> Result<Vec<CpuStat>, SampleError> {
        read_cpu_stats()
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, SampleError> {
        read_memory_info()
    }

    fn net_io_counters(&self) -> Result<Vec<(String, NetDevStats)>, SampleError> {
        netdev::read_netdev_stats()
    }
}
