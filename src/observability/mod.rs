//! Cache diagnostics: atomic counters and tracing spans.
//!
//! Subscribers and exporters are left to the application; the crate only
//! emits `tracing` events and keeps in-process counters.

mod metrics;
mod spans;

pub use metrics::{CacheMetrics, Counter, Histogram, MetricsSummary};
pub use spans::RefreshSpan;
