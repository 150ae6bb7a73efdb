//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use test_server::collectors::netdev::NetDevStats;
use test_server::system::{CpuStat, VirtualMemory};
use test_server::{SampleError, SystemSource};

/// Scripted host with a fixed number of cores and togglable failures.
pub struct FakeSource {
    pub cores: usize,
    pub fail_cpu: AtomicBool,
    pub fail_memory: AtomicBool,
    pub fail_network: AtomicBool,
    pub memory_used: AtomicU64,
    pub bytes_sent: AtomicU64,
    cpu_calls: AtomicU64,
}

pub const FAKE_MEMORY_TOTAL: u64 = 8 * 1024 * 1024 * 1024;

impl FakeSource {
    pub fn new(cores: usize) -> Self {
        Self {
            cores,
            fail_cpu: AtomicBool::new(false),
            fail_memory: AtomicBool::new(false),
            fail_network: AtomicBool::new(false),
            memory_used: AtomicU64::new(2 * 1024 * 1024 * 1024),
            bytes_sent: AtomicU64::new(1000),
            cpu_calls: AtomicU64::new(0),
        }
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_cpu.store(fail, Ordering::SeqCst);
        self.fail_memory.store(fail, Ordering::SeqCst);
        self.fail_network.store(fail, Ordering::SeqCst);
    }
}

fn injected(what: &str) -> SampleError {
    SampleError::Parse {
        file: "fake",
        reason: format!("injected {} failure", what),
    }
}

impl SystemSource for FakeSource {
    fn cpu_times(&self) -> Result<Vec<CpuStat>, SampleError> {
        if self.fail_cpu.load(Ordering::SeqCst) {
            return Err(injected("cpu"));
        }
        // Every snapshot adds 50 busy and 50 idle ticks per core: 50% usage
        let n = self.cpu_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((0..self.cores)
            .map(|_| CpuStat {
                user: 50 * n,
                idle: 50 * n,
                ..Default::default()
            })
            .collect())
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, SampleError> {
        if self.fail_memory.load(Ordering::SeqCst) {
            return Err(injected("memory"));
        }
        let used = self.memory_used.load(Ordering::SeqCst);
        Ok(VirtualMemory {
            total_bytes: FAKE_MEMORY_TOTAL,
            available_bytes: FAKE_MEMORY_TOTAL - used,
            used_bytes: used,
        })
    }

    fn net_io_counters(&self) -> Result<Vec<(String, NetDevStats)>, SampleError> {
        if self.fail_network.load(Ordering::SeqCst) {
            return Err(injected("network"));
        }
        let sent = self.bytes_sent.load(Ordering::SeqCst);
        Ok(vec![
            (
                "lo".to_string(),
                NetDevStats {
                    bytes_sent: sent,
                    bytes_recv: sent,
                    ..Default::default()
                },
            ),
            (
                "eth0".to_string(),
                NetDevStats {
                    bytes_recv: 2 * sent,
                    packets_recv: 20,
                    errors_in: 1,
                    bytes_sent: sent,
                    packets_sent: 10,
                    errors_out: 2,
                },
            ),
        ])
    }
}
