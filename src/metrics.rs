//! Prometheus instrument definitions for the test server.
//!
//! Every instrument is created and registered exactly once against an
//! explicitly constructed [`Registry`]. System gauges are written by the
//! sampler, HTTP instruments by the request middleware.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, DEFAULT_BUCKETS,
};

use crate::collectors::netdev::NetDevStats;

/// Collection of Prometheus instruments exposed by the server.
#[derive(Clone)]
pub struct ServerMetrics {
    // ========== CPU / Memory ==========
    pub cpu_usage_percent: GaugeVec, // labels: cpu
    pub memory_usage_bytes: Gauge,
    pub memory_total_bytes: Gauge,

    // ========== Network ==========
    pub network_bytes_sent: GaugeVec,   // labels: interface
    pub network_bytes_recv: GaugeVec,   // labels: interface
    pub network_packets_sent: GaugeVec, // labels: interface
    pub network_packets_recv: GaugeVec, // labels: interface
    pub network_errors_in: GaugeVec,    // labels: interface
    pub network_errors_out: GaugeVec,   // labels: interface

    // ========== HTTP ==========
    pub http_requests_total: CounterVec, // labels: method, endpoint, status
    pub http_request_duration_seconds: HistogramVec, // labels: method, endpoint

    // ========== Runtime ==========
    /// Alive tokio tasks. The name is kept for existing dashboards.
    pub goroutines: Gauge,
}

impl ServerMetrics {
    /// Creates and registers all instruments with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let cpu_usage_percent = GaugeVec::new(
            Opts::new("test_server_cpu_usage_percent", "CPU usage percentage"),
            &["cpu"],
        )?;
        let memory_usage_bytes =
            Gauge::new("test_server_memory_usage_bytes", "Memory usage in bytes")?;
        let memory_total_bytes =
            Gauge::new("test_server_memory_total_bytes", "Total memory in bytes")?;

        let interface_gauge = |name: &str, help: &str| -> Result<GaugeVec, prometheus::Error> {
            GaugeVec::new(Opts::new(name, help), &["interface"])
        };
        let network_bytes_sent =
            interface_gauge("test_server_network_bytes_sent", "Network bytes sent")?;
        let network_bytes_recv =
            interface_gauge("test_server_network_bytes_recv", "Network bytes received")?;
        let network_packets_sent =
            interface_gauge("test_server_network_packets_sent", "Network packets sent")?;
        let network_packets_recv = interface_gauge(
            "test_server_network_packets_recv",
            "Network packets received",
        )?;
        let network_errors_in = interface_gauge("test_server_network_errors_in", "Network errors in")?;
        let network_errors_out =
            interface_gauge("test_server_network_errors_out", "Network errors out")?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "test_server_http_requests_total",
                "Total number of HTTP requests",
            ),
            &["method", "endpoint", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "test_server_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(DEFAULT_BUCKETS.to_vec()),
            &["method", "endpoint"],
        )?;

        let goroutines = Gauge::new("test_server_goroutines", "Number of alive tokio tasks")?;

        registry.register(Box::new(cpu_usage_percent.clone()))?;
        registry.register(Box::new(memory_usage_bytes.clone()))?;
        registry.register(Box::new(memory_total_bytes.clone()))?;

        registry.register(Box::new(network_bytes_sent.clone()))?;
        registry.register(Box::new(network_bytes_recv.clone()))?;
        registry.register(Box::new(network_packets_sent.clone()))?;
        registry.register(Box::new(network_packets_recv.clone()))?;
        registry.register(Box::new(network_errors_in.clone()))?;
        registry.register(Box::new(network_errors_out.clone()))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        registry.register(Box::new(goroutines.clone()))?;

        Ok(Self {
            cpu_usage_percent,
            memory_usage_bytes,
            memory_total_bytes,
            network_bytes_sent,
            network_bytes_recv,
            network_packets_sent,
            network_packets_recv,
            network_errors_in,
            network_errors_out,
            http_requests_total,
            http_request_duration_seconds,
            goroutines,
        })
    }

    /// Sets the six network gauges of one interface.
    pub fn set_interface(&self, interface: &str, stats: &NetDevStats) {
        let labels = [interface];
        self.network_bytes_sent
            .with_label_values(&labels)
            .set(stats.bytes_sent as f64);
        self.network_bytes_recv
            .with_label_values(&labels)
            .set(stats.bytes_recv as f64);
        self.network_packets_sent
            .with_label_values(&labels)
            .set(stats.packets_sent as f64);
        self.network_packets_recv
            .with_label_values(&labels)
            .set(stats.packets_recv as f64);
        self.network_errors_in
            .with_label_values(&labels)
            .set(stats.errors_in as f64);
        self.network_errors_out
            .with_label_values(&labels)
            .set(stats.errors_out as f64);
    }

    /// Records one completed HTTP request.
    pub fn observe_request(&self, method: &str, endpoint: &str, status: u16, seconds: f64) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(seconds);
    }
}
