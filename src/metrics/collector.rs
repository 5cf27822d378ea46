// src/metrics/collector.rs
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        buffer
    }
}

pub struct MetricsCollector {
    // Inbound request metrics
    pub requests_total: IntCounterVec,

    // Outbound fetch metrics
    pub fetch_duration_seconds: Histogram,
    pub fetch_failures_total: IntCounter,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("fanout_requests_total", "Total number of inbound requests"),
            &["path"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let fetch_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "fanout_fetch_duration_seconds",
            "Downstream fetch duration in seconds",
        ))?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;

        let fetch_failures_total = IntCounter::new(
            "fanout_fetch_failures_total",
            "Transport-level downstream fetch failures",
        )?;
        registry.register(Box::new(fetch_failures_total.clone()))?;

        Ok(Self {
            requests_total,
            fetch_duration_seconds,
            fetch_failures_total,
        })
    }

    pub fn record_request(&self, path: &str) {
        self.requests_total.with_label_values(&[path]).inc();
    }

    pub fn record_fetch(&self, unreachable: bool, duration: std::time::Duration) {
        self.fetch_duration_seconds.observe(duration.as_secs_f64());
        if unreachable {
            self.fetch_failures_total.inc();
        }
    }

    pub fn requests_for(&self, path: &str) -> u64 {
        self.requests_total.with_label_values(&[path]).get()
    }
}

// Helper for timing the fetch
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
