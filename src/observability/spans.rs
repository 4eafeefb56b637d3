//! Structured spans for cache refreshes.

use std::time::Instant;

use tracing::{Level, Span, field, span};

use crate::prices::Freshness;

/// Span covering one refresh attempt, from quota check to publish.
pub struct RefreshSpan {
    span: Span,
    start: Instant,
}

impl RefreshSpan {
    pub fn new(forced: bool) -> Self {
        let span = span!(
            Level::INFO,
            "prices.refresh",
            forced = forced,
            outcome = field::Empty,
            freshness = field::Empty,
            latency_ms = field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn record_outcome(&self, outcome: &'static str, freshness: Freshness) {
        self.span.record("outcome", outcome);
        self.span.record("freshness", field::debug(freshness));
        self.span.record("latency_ms", self.elapsed_ms());
    }
}
