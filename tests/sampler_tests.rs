//! Integration tests for the system sampler.
//!
//! These tests drive the sampler with a scripted source to verify gauge
//! updates, the stale-read behaviour on failures, and prompt shutdown.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{FakeSource, FAKE_MEMORY_TOTAL};
use prometheus::{Registry, TextEncoder};
use test_server::{sampler, Sampler, SamplerSettings, ServerMetrics};
use tokio::sync::watch;

fn fast_settings() -> SamplerSettings {
    SamplerSettings {
        interval: Duration::from_millis(20),
        cpu_window: Duration::from_millis(5),
    }
}

fn setup(cores: usize, settings: SamplerSettings) -> (Arc<FakeSource>, ServerMetrics, Sampler) {
    let source = Arc::new(FakeSource::new(cores));
    let metrics = ServerMetrics::new(&Registry::new()).unwrap();
    let sampler = Sampler::new(source.clone(), metrics.clone(), settings);
    (source, metrics, sampler)
}

fn cpu_series(metrics: &ServerMetrics, cores: usize) -> Vec<f64> {
    (0..cores)
        .map(|i| {
            metrics
                .cpu_usage_percent
                .with_label_values(&[format!("cpu{}", i).as_str()])
                .get()
        })
        .collect()
}

#[tokio::test]
async fn test_sample_once_sets_all_gauges() {
    let (_source, metrics, sampler) = setup(4, fast_settings());
    let (_tx, mut rx) = watch::channel(false);

    let report = sampler.sample_once(&mut rx).await;

    assert!(report.cpu && report.memory && report.network);
    assert!(!report.interrupted);

    for value in cpu_series(&metrics, 4) {
        assert!((value - 50.0).abs() < 1e-9, "unexpected cpu value {}", value);
    }
    assert_eq!(metrics.memory_total_bytes.get(), FAKE_MEMORY_TOTAL as f64);
    assert_eq!(
        metrics.memory_usage_bytes.get(),
        (2u64 * 1024 * 1024 * 1024) as f64
    );
    assert_eq!(
        metrics.network_bytes_recv.with_label_values(&["eth0"]).get(),
        2000.0
    );
    assert_eq!(
        metrics.network_errors_out.with_label_values(&["eth0"]).get(),
        2.0
    );
    assert_eq!(
        metrics.network_bytes_sent.with_label_values(&["lo"]).get(),
        1000.0
    );
}

#[tokio::test]
async fn test_cpu_gauge_per_core() {
    let registry = Registry::new();
    let metrics = ServerMetrics::new(&registry).unwrap();
    let sampler = Sampler::new(Arc::new(FakeSource::new(3)), metrics, fast_settings());
    let (_tx, mut rx) = watch::channel(false);

    sampler.sample_once(&mut rx).await;

    let text = TextEncoder::new()
        .encode_to_string(&registry.gather())
        .unwrap();
    let series = text
        .lines()
        .filter(|line| line.starts_with("test_server_cpu_usage_percent{"))
        .count();
    assert_eq!(series, 3);
}

#[tokio::test]
async fn test_failed_cycle_keeps_previous_values() {
    let (source, metrics, sampler) = setup(2, fast_settings());
    let (_tx, mut rx) = watch::channel(false);

    sampler.sample_once(&mut rx).await;
    let cpu_before = cpu_series(&metrics, 2);
    let used_before = metrics.memory_usage_bytes.get();
    let sent_before = metrics.network_bytes_sent.with_label_values(&["eth0"]).get();

    // Underlying values change, but every query fails this cycle
    source.memory_used.store(5 * 1024 * 1024 * 1024, Ordering::SeqCst);
    source.bytes_sent.store(999_999, Ordering::SeqCst);
    source.fail_all(true);

    let report = sampler.sample_once(&mut rx).await;
    assert!(!report.cpu && !report.memory && !report.network);

    assert_eq!(cpu_series(&metrics, 2), cpu_before);
    assert_eq!(metrics.memory_usage_bytes.get(), used_before);
    assert_eq!(
        metrics.network_bytes_sent.with_label_values(&["eth0"]).get(),
        sent_before
    );

    // Next successful cycle picks up the new values
    source.fail_all(false);
    sampler.sample_once(&mut rx).await;
    assert_eq!(
        metrics.memory_usage_bytes.get(),
        (5u64 * 1024 * 1024 * 1024) as f64
    );
    assert_eq!(
        metrics.network_bytes_sent.with_label_values(&["eth0"]).get(),
        999_999.0
    );
}

#[tokio::test]
async fn test_partial_failure_only_skips_that_measurement() {
    let (source, metrics, sampler) = setup(1, fast_settings());
    let (_tx, mut rx) = watch::channel(false);

    source.fail_memory.store(true, Ordering::SeqCst);
    let report = sampler.sample_once(&mut rx).await;

    assert!(report.cpu);
    assert!(!report.memory);
    assert!(report.network);
    // Never sampled successfully, so still at its initial value
    assert_eq!(metrics.memory_total_bytes.get(), 0.0);
}

#[tokio::test]
async fn test_goroutines_gauge_counts_tasks() {
    let (source, metrics, sampler) = setup(1, fast_settings());
    source.fail_all(true);
    let (_tx, mut rx) = watch::channel(false);

    let parked = tokio::spawn(std::future::pending::<()>());
    sampler.sample_once(&mut rx).await;

    // Set even when every other measurement failed
    assert!(metrics.goroutines.get() >= 1.0);
    parked.abort();
}

#[tokio::test]
async fn test_spawned_sampler_updates_and_stops() {
    let (_source, metrics, sampler) = setup(2, fast_settings());
    let handle = sampler::spawn(sampler);

    let mut waited = Duration::ZERO;
    while metrics.memory_total_bytes.get() == 0.0 && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert_eq!(metrics.memory_total_bytes.get(), FAKE_MEMORY_TOTAL as f64);
    assert!(!handle.is_finished());

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("sampler did not stop");
}

#[tokio::test]
async fn test_shutdown_interrupts_long_waits() {
    // Window and interval far longer than the test timeout
    let settings = SamplerSettings {
        interval: Duration::from_secs(600),
        cpu_window: Duration::from_secs(300),
    };
    let (_source, metrics, sampler) = setup(1, settings);
    let handle = sampler::spawn(sampler);

    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("sampler did not stop during the CPU window");

    // The interrupted cycle never got past the CPU window
    assert_eq!(metrics.memory_total_bytes.get(), 0.0);
}

#[tokio::test]
async fn test_sample_once_after_shutdown_is_interrupted() {
    let (_source, metrics, sampler) = setup(1, fast_settings());
    let (tx, mut rx) = watch::channel(false);
    tx.send(true).unwrap();

    let report = sampler.sample_once(&mut rx).await;

    assert!(report.interrupted);
    assert!(!report.cpu);
    assert_eq!(metrics.memory_total_bytes.get(), 0.0);
}
