//! Price cache end to end: HTTP source, file persistence, quota and fallback.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use signage_pricing::{
    DesignAspect, Freshness, HttpPriceSource, LineItemKind, ManualClock, PriceCacheService,
    PriceKey, PriceReferenceStore, RefreshError, ShippingTier, SignConfiguration,
};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRICES_PATH: &str = "/prices";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 12, 14, 0, 0).unwrap())
}

fn price_rows() -> serde_json::Value {
    json!({"list": [
        {"key": "led_per_m", "value": 10},
        {"key": "controller_unit_price", "value": 30},
        {"key": "shipping_m", "value": 45},
    ]})
}

async fn mount_prices(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(PRICES_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(price_rows())
                .set_delay(Duration::from_millis(50)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn service(
    server: &MockServer,
    store: PriceReferenceStore,
    clock: &ManualClock,
) -> PriceCacheService {
    let url = Url::parse(&format!("{}{}", server.uri(), PRICES_PATH)).unwrap();
    let source = HttpPriceSource::builder(url)
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    PriceCacheService::builder(Arc::new(source))
        .store(store)
        .clock(Arc::new(clock.clone()))
        .request_timeout(Duration::from_secs(2))
        .build()
}

// ============================================================================
// Deduplication and TTL
// ============================================================================

mod dedup_tests {
    use super::*;

    #[tokio::test]
    async fn test_ten_cold_callers_one_request() {
        init_tracing();
        let server = MockServer::start().await;
        mount_prices(&server, 1).await;
        let service = service(&server, PriceReferenceStore::in_memory(), &clock());

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.snapshot().await })
            })
            .collect();

        for task in tasks {
            let snapshot = task.await.unwrap();
            assert_eq!(snapshot.freshness(), Freshness::Fresh);
            assert_eq!(snapshot.price(PriceKey::LedPerMeter), dec!(10));
        }
        assert_eq!(service.metrics().fetch_attempts, 1);
    }

    #[tokio::test]
    async fn test_hit_within_ttl_makes_no_request() {
        let server = MockServer::start().await;
        mount_prices(&server, 1).await;
        let clock = clock();
        let service = service(&server, PriceReferenceStore::in_memory(), &clock);

        service.snapshot().await;
        clock.advance(chrono::Duration::minutes(10));
        service.snapshot().await;
        service.snapshot().await;

        let summary = service.metrics();
        assert_eq!(summary.cache_hits, 2);
        assert_eq!(summary.fetch_attempts, 1);
    }
}

// ============================================================================
// Persistence
// ============================================================================

mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn test_restart_reuses_persisted_table() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("prices.json");
        let clock = clock();

        let server = MockServer::start().await;
        mount_prices(&server, 1).await;

        let first = service(&server, PriceReferenceStore::file(&store_path), &clock);
        first.snapshot().await;
        assert!(store_path.exists());

        // A fresh process within the TTL reads the file and stays offline.
        clock.advance(chrono::Duration::minutes(5));
        let second = service(&server, PriceReferenceStore::file(&store_path), &clock);
        let snapshot = second.snapshot().await;
        assert_eq!(snapshot.freshness(), Freshness::Fresh);
        assert_eq!(snapshot.price(PriceKey::ControllerUnitPrice), dec!(30));
        assert_eq!(second.metrics().fetch_attempts, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_replaced_after_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("prices.json");
        tokio::fs::write(&store_path, "{ truncated").await.unwrap();
        let clock = clock();

        let server = MockServer::start().await;
        mount_prices(&server, 1).await;

        let first = service(&server, PriceReferenceStore::file(&store_path), &clock);
        assert_eq!(first.snapshot().await.freshness(), Freshness::Fresh);

        clock.advance(chrono::Duration::minutes(5));
        let second = service(&server, PriceReferenceStore::file(&store_path), &clock);
        let snapshot = second.snapshot().await;
        assert_eq!(snapshot.price(PriceKey::ControllerUnitPrice), dec!(30));
        assert_eq!(second.metrics().fetch_attempts, 0);
    }

    #[tokio::test]
    async fn test_outage_after_restart_serves_stale_file() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("prices.json");
        let clock = clock();

        let healthy = MockServer::start().await;
        mount_prices(&healthy, 1).await;
        service(&healthy, PriceReferenceStore::file(&store_path), &clock)
            .snapshot()
            .await;

        let broken = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&broken)
            .await;

        clock.advance(chrono::Duration::hours(6));
        let restarted = service(&broken, PriceReferenceStore::file(&store_path), &clock);
        let snapshot = restarted.snapshot().await;

        assert_eq!(snapshot.freshness(), Freshness::Stale);
        assert_eq!(snapshot.price(PriceKey::ShippingM), dec!(45));
        assert_eq!(restarted.metrics().stale_served, 1);
    }

    #[tokio::test]
    async fn test_outage_without_history_serves_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let service = service(
            &server,
            PriceReferenceStore::file(temp_dir.path().join("prices.json")),
            &clock(),
        );
        let snapshot = service.snapshot().await;

        assert_eq!(snapshot.freshness(), Freshness::Fallback);
        assert_eq!(
            snapshot.price(PriceKey::LedPerMeter),
            PriceKey::LedPerMeter.default_value()
        );
        assert!(service.force_refresh().await.is_err());
    }
}

// ============================================================================
// Quota and forced refresh
// ============================================================================

mod quota_tests {
    use super::*;

    #[tokio::test]
    async fn test_quota_resets_next_day() {
        let server = MockServer::start().await;
        mount_prices(&server, 2).await;
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 12, 23, 0, 0).unwrap());
        let url = Url::parse(&format!("{}{}", server.uri(), PRICES_PATH)).unwrap();
        let service =
            PriceCacheService::builder(Arc::new(HttpPriceSource::builder(url).build().unwrap()))
                .clock(Arc::new(clock.clone()))
                .daily_quota(1)
                .build();

        service.snapshot().await;
        clock.advance(chrono::Duration::minutes(45));
        assert_eq!(service.snapshot().await.freshness(), Freshness::Stale);
        assert_eq!(service.metrics().quota_rejections, 1);

        clock.advance(chrono::Duration::minutes(30));
        assert_eq!(service.snapshot().await.freshness(), Freshness::Fresh);
        assert_eq!(service.quota_state().count, 1);
    }

    #[tokio::test]
    async fn test_force_refresh_reports_quota() {
        let server = MockServer::start().await;
        mount_prices(&server, 1).await;
        let url = Url::parse(&format!("{}{}", server.uri(), PRICES_PATH)).unwrap();
        let service =
            PriceCacheService::builder(Arc::new(HttpPriceSource::builder(url).build().unwrap()))
                .clock(Arc::new(clock()))
                .daily_quota(1)
                .build();

        service.force_refresh().await.unwrap();
        let err = service.force_refresh().await.unwrap_err();
        assert_eq!(err, RefreshError::QuotaExhausted { ceiling: 1 });
        assert_eq!(service.cached().unwrap().freshness(), Freshness::Stale);
    }
}

// ============================================================================
// Quotes through the service
// ============================================================================

mod quote_tests {
    use super::*;

    #[tokio::test]
    async fn test_quote_uses_fetched_prices() {
        let server = MockServer::start().await;
        mount_prices(&server, 1).await;
        let service = service(&server, PriceReferenceStore::in_memory(), &clock());

        let design = DesignAspect::new(dec!(200), dec!(60), dec!(5.2), 1).unwrap();
        let sign = SignConfiguration::builder(design)
            .width(dec!(100))
            .build()
            .unwrap();

        let breakdown = service.quote(&sign).await;
        assert_eq!(breakdown.freshness, Freshness::Fresh);
        assert_eq!(breakdown.amount(LineItemKind::Led), dec!(26));
        assert_eq!(breakdown.amount(LineItemKind::Controller), dec!(30));

        let shipping = service.shipping_quote(sign.longest_side()).await;
        assert_eq!(shipping.tier, ShippingTier::M);
        assert_eq!(shipping.price, dec!(45));
        assert_eq!(service.metrics().fetch_attempts, 1);
    }
}
