//! Atomic counters for price cache diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::prices::Freshness;

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Simple histogram using fixed buckets.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    bucket_bounds: Vec<f64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bucket_bounds: Vec<f64>) -> Self {
        let buckets = (0..=bucket_bounds.len())
            .map(|_| AtomicU64::new(0))
            .collect();
        Self {
            buckets,
            bucket_bounds,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Millisecond buckets sized for a backend that answers in seconds.
    pub fn fetch_latency() -> Self {
        Self::new(vec![
            50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
        ])
    }

    pub fn observe(&self, value: f64) {
        let bucket_idx = self
            .bucket_bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bucket_bounds.len());

        self.buckets[bucket_idx].fetch_add(1, Ordering::Relaxed);
        // Stored scaled by 1000 to keep sub-millisecond precision.
        self.sum
            .fetch_add((value.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    pub fn sum_ms(&self) -> f64 {
        self.sum.load(Ordering::Relaxed) as f64 / 1000.0
    }
}

/// Counters owned by one [`PriceCacheService`](crate::prices::PriceCacheService).
#[derive(Debug)]
pub struct CacheMetrics {
    pub snapshot_requests: Counter,
    pub cache_hits: Counter,
    pub stale_served: Counter,
    pub fallback_served: Counter,
    pub fetch_attempts: Counter,
    pub fetch_failures: Counter,
    pub quota_rejections: Counter,
    pub fetch_latency_ms: Histogram,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            snapshot_requests: Counter::new(),
            cache_hits: Counter::new(),
            stale_served: Counter::new(),
            fallback_served: Counter::new(),
            fetch_attempts: Counter::new(),
            fetch_failures: Counter::new(),
            quota_rejections: Counter::new(),
            fetch_latency_ms: Histogram::fetch_latency(),
        }
    }

    pub fn record_fetch(&self, success: bool, latency_ms: f64) {
        self.fetch_attempts.inc();
        self.fetch_latency_ms.observe(latency_ms);
        if !success {
            self.fetch_failures.inc();
        }
    }

    /// Counts a degraded answer by the freshness it was served with.
    pub fn record_degraded(&self, freshness: Freshness) {
        match freshness {
            Freshness::Stale => self.stale_served.inc(),
            Freshness::Fallback => self.fallback_served.inc(),
            Freshness::Fresh => {}
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary::from_metrics(self)
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub snapshot_requests: u64,
    pub cache_hits: u64,
    pub stale_served: u64,
    pub fallback_served: u64,
    pub fetch_attempts: u64,
    pub fetch_failures: u64,
    pub quota_rejections: u64,
    pub avg_fetch_latency_ms: f64,
}

impl MetricsSummary {
    pub fn from_metrics(metrics: &CacheMetrics) -> Self {
        let count = metrics.fetch_latency_ms.count();
        let avg_fetch_latency_ms = if count > 0 {
            metrics.fetch_latency_ms.sum_ms() / count as f64
        } else {
            0.0
        };

        Self {
            snapshot_requests: metrics.snapshot_requests.get(),
            cache_hits: metrics.cache_hits.get(),
            stale_served: metrics.stale_served.get(),
            fallback_served: metrics.fallback_served.get(),
            fetch_attempts: metrics.fetch_attempts.get(),
            fetch_failures: metrics.fetch_failures.get(),
            quota_rejections: metrics.quota_rejections.get(),
            avg_fetch_latency_ms,
        }
    }

    /// Share of snapshot requests answered without a fetch or a fallback.
    pub fn hit_rate(&self) -> f64 {
        if self.snapshot_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.snapshot_requests as f64
        }
    }
}
