//! Price reference cache.
//!
//! Serves price snapshots from memory, the persisted store, a live fetch or
//! built-in defaults, in that order of preference. Concurrent callers on a
//! cold or expired cache share one refresh, and every outbound fetch is
//! charged against the daily quota.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{Instrument, debug, info, trace, warn};

use super::quota::{DEFAULT_DAILY_QUOTA, QuotaGuard, QuotaState};
use super::source::{DEFAULT_REQUEST_TIMEOUT, FetchError, PriceSource};
use super::{Freshness, PriceReferenceStore, PriceTableSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::observability::{CacheMetrics, MetricsSummary, RefreshSpan};
use crate::pricing::{PriceBreakdown, ShippingQuote, SignConfiguration, compute_total, select_tier};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Why a refresh produced no new table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("Daily price fetch quota of {ceiling} exhausted")]
    QuotaExhausted { ceiling: u32 },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

type RefreshOutcome = Result<Arc<PriceTableSnapshot>, RefreshError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

enum Slot {
    Ready(Arc<PriceTableSnapshot>),
    Pending(PendingRefresh),
}

struct Inner {
    source: Arc<dyn PriceSource>,
    store: PriceReferenceStore,
    quota: QuotaGuard,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    request_timeout: Duration,
    current: RwLock<Option<Arc<PriceTableSnapshot>>>,
    hydrated: OnceCell<()>,
    in_flight: Mutex<Option<PendingRefresh>>,
    metrics: CacheMetrics,
}

/// Cheaply cloneable handle; clones share one cache, one quota and one
/// in-flight refresh.
#[derive(Clone)]
pub struct PriceCacheService {
    inner: Arc<Inner>,
}

impl PriceCacheService {
    pub fn builder(source: Arc<dyn PriceSource>) -> PriceCacheServiceBuilder {
        PriceCacheServiceBuilder::new(source)
    }

    /// Current price table. Never fails: expiry, quota exhaustion and fetch
    /// errors all degrade to the last known table or to built-in defaults.
    pub async fn snapshot(&self) -> Arc<PriceTableSnapshot> {
        let inner = &self.inner;
        inner.metrics.snapshot_requests.inc();
        inner.hydrate().await;

        if let Some(current) = inner.fresh_current() {
            inner.metrics.cache_hits.inc();
            trace!(age_secs = current.age(inner.clock.now()).num_seconds(), "price cache hit");
            return current;
        }

        let pending = match self.join_or_start(false) {
            Slot::Ready(current) => {
                inner.metrics.cache_hits.inc();
                return current;
            }
            Slot::Pending(pending) => pending,
        };

        match pending.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let best = inner.best_available();
                inner.metrics.record_degraded(best.freshness());
                debug!(reason = %e, freshness = ?best.freshness(), "serving cached prices");
                best
            }
        }
    }

    /// Drops the persisted table and refetches regardless of TTL.
    ///
    /// In-memory prices survive as [`Freshness::Stale`] so `snapshot` can
    /// still serve them if this fails. Joins a refresh already in flight.
    pub async fn force_refresh(&self) -> Result<Arc<PriceTableSnapshot>, RefreshError> {
        let inner = &self.inner;
        inner.hydrate().await;

        if let Err(e) = inner.store.clear().await {
            warn!(error = %e, "failed to clear persisted price table");
        }
        inner.demote_current();

        let result = match self.join_or_start(true) {
            Slot::Ready(current) => Ok(current),
            Slot::Pending(pending) => pending.await,
        };
        if let Err(e) = &result {
            warn!(error = %e, "forced price refresh failed");
        }
        result
    }

    /// In-memory snapshot, without touching the store or the network.
    pub fn cached(&self) -> Option<Arc<PriceTableSnapshot>> {
        self.inner.current()
    }

    pub fn quota_state(&self) -> QuotaState {
        self.inner.quota.state()
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.inner.metrics.summary()
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.inner.ttl
    }

    pub async fn quote(&self, config: &SignConfiguration) -> PriceBreakdown {
        let snapshot = self.snapshot().await;
        compute_total(config, &snapshot)
    }

    pub async fn shipping_quote(&self, longest_side_cm: Decimal) -> ShippingQuote {
        let snapshot = self.snapshot().await;
        select_tier(longest_side_cm, &snapshot)
    }

    fn join_or_start(&self, forced: bool) -> Slot {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Some(pending) = slot.as_ref() {
            debug!(forced, "joining in-flight price refresh");
            return Slot::Pending(pending.clone());
        }
        // A refresh may have published between the caller's check and here.
        if !forced && let Some(current) = self.inner.fresh_current() {
            return Slot::Ready(current);
        }

        let inner = Arc::clone(&self.inner);
        let pending = async move { inner.refresh(forced).await }.boxed().shared();
        *slot = Some(pending.clone());
        Slot::Pending(pending)
    }
}

impl Inner {
    async fn hydrate(&self) {
        self.hydrated
            .get_or_init(|| async {
                match self.store.load().await {
                    Ok(Some(persisted)) => {
                        debug!(
                            entries = persisted.len(),
                            as_of = %persisted.as_of(),
                            "hydrated price cache from store"
                        );
                        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
                        if current.is_none() {
                            *current = Some(Arc::new(persisted));
                        }
                    }
                    Ok(None) => debug!("no persisted price table"),
                    Err(e) => warn!(error = %e, "ignoring unreadable persisted price table"),
                }
            })
            .await;
    }

    fn current(&self) -> Option<Arc<PriceTableSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn fresh_current(&self) -> Option<Arc<PriceTableSnapshot>> {
        let now = self.clock.now();
        self.current().filter(|s| s.is_fresh(now, self.ttl))
    }

    fn publish(&self, snapshot: Arc<PriceTableSnapshot>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
    }

    fn demote_current(&self) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = current.as_ref()
            && snapshot.freshness() == Freshness::Fresh
        {
            *current = Some(Arc::new(snapshot.as_stale()));
        }
    }

    /// Fresh table if one exists, else last known data marked stale, else
    /// defaults. Defaults are never stored as current.
    fn best_available(&self) -> Arc<PriceTableSnapshot> {
        let now = self.clock.now();
        match self.current() {
            Some(s) if s.is_fresh(now, self.ttl) => s,
            Some(s) if s.freshness() == Freshness::Fresh => Arc::new(s.as_stale()),
            Some(s) => s,
            None => Arc::new(PriceTableSnapshot::builtin_defaults(now)),
        }
    }

    async fn refresh(self: Arc<Self>, forced: bool) -> RefreshOutcome {
        let span = RefreshSpan::new(forced);
        let outcome = self
            .fetch_and_publish(&span)
            .instrument(span.span().clone())
            .await;
        *self.in_flight.lock().unwrap_or_else(|e| e.into_inner()) = None;
        outcome
    }

    async fn fetch_and_publish(&self, span: &RefreshSpan) -> RefreshOutcome {
        if !self.quota.try_consume() {
            self.metrics.quota_rejections.inc();
            let state = self.quota.state();
            warn!(
                count = state.count,
                ceiling = state.ceiling,
                "daily price fetch quota exhausted"
            );
            span.record_outcome("quota_exhausted", self.best_available().freshness());
            return Err(RefreshError::QuotaExhausted {
                ceiling: state.ceiling,
            });
        }

        let started = Instant::now();
        let fetched = match tokio::time::timeout(self.request_timeout, self.source.fetch()).await {
            Ok(Ok(entries)) if entries.is_empty() => Err(FetchError::EmptyTable { skipped: 0 }),
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.request_timeout)),
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_fetch(fetched.is_ok(), latency_ms);

        let entries = match fetched {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    error = %e,
                    kind = ?e.kind(),
                    source = self.source.name(),
                    "price fetch failed"
                );
                span.record_outcome("fetch_failed", self.best_available().freshness());
                return Err(e.into());
            }
        };

        let snapshot = Arc::new(PriceTableSnapshot::fresh(entries, self.clock.now()));
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(error = %e, "failed to persist price table");
        }
        self.publish(Arc::clone(&snapshot));

        info!(entries = snapshot.len(), latency_ms, "price table refreshed");
        span.record_outcome("fetched", Freshness::Fresh);
        Ok(snapshot)
    }
}

impl std::fmt::Debug for PriceCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceCacheService")
            .field("source", &self.inner.source.name())
            .field("store", &self.inner.store)
            .field("ttl", &self.inner.ttl)
            .field("quota", &self.inner.quota)
            .finish()
    }
}

pub struct PriceCacheServiceBuilder {
    source: Arc<dyn PriceSource>,
    store: Option<PriceReferenceStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    daily_quota: u32,
    request_timeout: Duration,
}

impl PriceCacheServiceBuilder {
    fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            store: None,
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_TTL,
            daily_quota: DEFAULT_DAILY_QUOTA,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Defaults to a non-persistent in-memory store.
    pub fn store(mut self, store: PriceReferenceStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn daily_quota(mut self, ceiling: u32) -> Self {
        self.daily_quota = ceiling;
        self
    }

    /// Upper bound on one fetch, applied around the source.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> PriceCacheService {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        PriceCacheService {
            inner: Arc::new(Inner {
                quota: QuotaGuard::with_clock(self.daily_quota, Arc::clone(&self.clock)),
                source: self.source,
                store: self.store.unwrap_or_else(PriceReferenceStore::in_memory),
                clock: self.clock,
                ttl,
                request_timeout: self.request_timeout,
                current: RwLock::new(None),
                hydrated: OnceCell::new(),
                in_flight: Mutex::new(None),
                metrics: CacheMetrics::new(),
            }),
        }
    }
}
