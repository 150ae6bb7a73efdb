//! Background sampling loop for the system gauges.
//!
//! The sampler wakes up every `interval`, measures per-core CPU utilization
//! over `cpu_window`, reads virtual memory and network counters, and writes
//! the results into [`ServerMetrics`]. A measurement that fails is skipped for
//! that cycle, so its gauges keep the last successfully observed value.
//!
//! The loop is bound to a `watch` channel: [`SamplerHandle::shutdown`] stops
//! it even while it is waiting inside the CPU window or the interval sleep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::metrics::ServerMetrics;
use crate::system::{cpu_percentages, SystemSource};

pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_CPU_WINDOW_SECS: u64 = 1;

/// Timing of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Observation window for CPU utilization.
    pub cpu_window: Duration,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SAMPLE_INTERVAL_SECS),
            cpu_window: Duration::from_secs(DEFAULT_CPU_WINDOW_SECS),
        }
    }
}

impl SamplerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(
                config
                    .sample_interval_secs
                    .unwrap_or(DEFAULT_SAMPLE_INTERVAL_SECS),
            ),
            cpu_window: Duration::from_secs(
                config.cpu_sample_window_secs.unwrap_or(DEFAULT_CPU_WINDOW_SECS),
            ),
        }
    }
}

/// Which measurements of a cycle were written to the gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleReport {
    pub cpu: bool,
    pub memory: bool,
    pub network: bool,
    /// Shutdown arrived during the CPU window; the rest of the cycle was skipped.
    pub interrupted: bool,
}

/// Periodic sampler of host statistics.
pub struct Sampler {
    source: Arc<dyn SystemSource>,
    metrics: ServerMetrics,
    settings: SamplerSettings,
}

impl Sampler {
    pub fn new(
        source: Arc<dyn SystemSource>,
        metrics: ServerMetrics,
        settings: SamplerSettings,
    ) -> Self {
        Self {
            source,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> SamplerSettings {
        self.settings
    }

    /// Runs a single sampling cycle.
    pub async fn sample_once(&self, shutdown: &mut watch::Receiver<bool>) -> SampleReport {
        let mut report = SampleReport::default();

        // CPU: two snapshots taken one window apart
        match self.source.cpu_times() {
            Ok(before) => {
                if wait_or_shutdown(self.settings.cpu_window, shutdown).await {
                    report.interrupted = true;
                    return report;
                }
                match self
                    .source
                    .cpu_times()
                    .and_then(|after| cpu_percentages(&before, &after))
                {
                    Ok(percentages) => {
                        for (i, percent) in percentages.iter().enumerate() {
                            self.metrics
                                .cpu_usage_percent
                                .with_label_values(&[format!("cpu{}", i).as_str()])
                                .set(*percent);
                        }
                        report.cpu = true;
                    }
                    Err(e) => debug!("Skipping CPU sample: {}", e),
                }
            }
            Err(e) => debug!("Skipping CPU sample: {}", e),
        }

        match self.source.virtual_memory() {
            Ok(mem) => {
                self.metrics.memory_usage_bytes.set(mem.used_bytes as f64);
                self.metrics.memory_total_bytes.set(mem.total_bytes as f64);
                report.memory = true;
            }
            Err(e) => debug!("Skipping memory sample: {}", e),
        }

        match self.source.net_io_counters() {
            Ok(interfaces) => {
                for (name, stats) in &interfaces {
                    self.metrics.set_interface(name, stats);
                }
                report.network = true;
            }
            Err(e) => debug!("Skipping network sample: {}", e),
        }

        self.metrics.goroutines.set(alive_tasks());

        report
    }

    /// Runs the sampling loop until shutdown is signalled.
    #[instrument(skip_all)]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "System sampler started (interval {:?}, cpu window {:?})",
            self.settings.interval, self.settings.cpu_window
        );

        loop {
            let report = self.sample_once(&mut shutdown).await;
            if report.interrupted {
                break;
            }
            debug!(
                "Sampling cycle finished: cpu={} memory={} network={}",
                report.cpu, report.memory, report.network
            );

            if wait_or_shutdown(self.settings.interval, &mut shutdown).await {
                break;
            }
        }

        info!("System sampler stopped");
    }
}

/// Handle to a sampler running on its own task.
pub struct SamplerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("System sampler task ended abnormally: {}", e);
        }
    }
}

/// Starts the sampler on a dedicated tokio task.
pub fn spawn(sampler: Sampler) -> SamplerHandle {
    let (shutdown, rx) = watch::channel(false);
    let task = tokio::spawn(sampler.run(rx));
    SamplerHandle { shutdown, task }
}

/// Sleeps for `duration` unless shutdown is signalled first.
///
/// Returns `true` when the caller should stop.
async fn wait_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }

    let changed = tokio::select! {
        _ = tokio::time::sleep(duration) => return false,
        changed = shutdown.changed() => changed,
    };

    // A dropped sender also means stop
    changed.is_err() || *shutdown.borrow()
}

/// Number of tasks alive on the current tokio runtime, 0 outside a runtime.
fn alive_tasks() -> f64 {
    tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_alive_tasks() as f64)
        .unwrap_or(0.0)
}
