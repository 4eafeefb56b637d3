//! Price entries and immutable price table snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PriceKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub key: PriceKey,
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl PriceEntry {
    pub fn new(key: PriceKey, value: Decimal, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            unit: key.default_unit().map(str::to_string),
            fetched_at,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    fn builtin(key: PriceKey, at: DateTime<Utc>) -> Self {
        Self::new(key, key.default_value(), at)
    }
}

/// Where a snapshot's prices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Live fetch within the TTL.
    Fresh,
    /// Previously fetched data served after expiry or a failed refresh.
    Stale,
    /// Built-in defaults; no fetched data was available.
    Fallback,
}

/// Immutable view of the price table at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTableSnapshot {
    entries: BTreeMap<PriceKey, PriceEntry>,
    as_of: DateTime<Utc>,
    freshness: Freshness,
}

impl PriceTableSnapshot {
    /// Builds a snapshot keeping the first entry per key and dropping values
    /// outside `0..=key.max_value()`.
    pub fn new(
        entries: impl IntoIterator<Item = PriceEntry>,
        as_of: DateTime<Utc>,
        freshness: Freshness,
    ) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            if !in_range(&entry) {
                continue;
            }
            map.entry(entry.key).or_insert(entry);
        }
        Self {
            entries: map,
            as_of,
            freshness,
        }
    }

    pub fn fresh(entries: impl IntoIterator<Item = PriceEntry>, as_of: DateTime<Utc>) -> Self {
        Self::new(entries, as_of, Freshness::Fresh)
    }

    /// Snapshot populated entirely from [`PriceKey::default_value`].
    pub fn builtin_defaults(as_of: DateTime<Utc>) -> Self {
        Self::new(
            PriceKey::ALL.into_iter().map(|k| PriceEntry::builtin(k, as_of)),
            as_of,
            Freshness::Fallback,
        )
    }

    /// Same prices and timestamp, marked [`Freshness::Stale`].
    pub fn as_stale(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            as_of: self.as_of,
            freshness: Freshness::Stale,
        }
    }

    /// Price for `key`, or its built-in default when the table lacks it or
    /// holds a value out of range.
    pub fn price(&self, key: PriceKey) -> Decimal {
        self.entries
            .get(&key)
            .filter(|e| in_range(e))
            .map(|e| e.value)
            .unwrap_or_else(|| key.default_value())
    }

    pub fn get(&self, key: PriceKey) -> Option<&PriceEntry> {
        self.entries.get(&key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PriceEntry> {
        self.entries.values()
    }

    pub(crate) fn entry_map(&self) -> &BTreeMap<PriceKey, PriceEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.as_of
    }

    /// True for a fetched snapshot younger than `ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.freshness == Freshness::Fresh && self.age(now) < ttl
    }
}

fn in_range(entry: &PriceEntry) -> bool {
    entry.value >= Decimal::ZERO && entry.value <= entry.key.max_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_first_entry_per_key_wins() {
        let snapshot = PriceTableSnapshot::fresh(
            vec![
                PriceEntry::new(PriceKey::LedPerMeter, dec!(9), at()),
                PriceEntry::new(PriceKey::LedPerMeter, dec!(11), at()),
            ],
            at(),
        );
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.price(PriceKey::LedPerMeter), dec!(9));
    }

    #[test]
    fn test_negative_values_dropped() {
        let snapshot = PriceTableSnapshot::fresh(
            vec![PriceEntry::new(PriceKey::LedPerMeter, dec!(-1), at())],
            at(),
        );
        assert!(snapshot.is_empty());
        assert_eq!(
            snapshot.price(PriceKey::LedPerMeter),
            PriceKey::LedPerMeter.default_value()
        );
    }

    #[test]
    fn test_oversized_values_dropped() {
        let huge = Decimal::from_scientific("1e27").unwrap();
        let snapshot = PriceTableSnapshot::fresh(
            vec![
                PriceEntry::new(PriceKey::AdminSurchargeRate, huge, at()),
                PriceEntry::new(PriceKey::ShippingXl, Decimal::MAX, at()),
            ],
            at(),
        );
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.price(PriceKey::AdminSurchargeRate), dec!(0.10));
    }

    #[test]
    fn test_deserialized_oversized_value_reads_as_default() {
        let json = serde_json::json!({
            "entries": {
                "admin_surcharge_rate": {
                    "key": "admin_surcharge_rate",
                    "value": "1000000000000000000000000000",
                    "fetched_at": "2024-05-10T12:00:00Z"
                }
            },
            "as_of": "2024-05-10T12:00:00Z",
            "freshness": "fresh"
        });
        let snapshot: PriceTableSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.price(PriceKey::AdminSurchargeRate), dec!(0.10));
    }

    #[test]
    fn test_builtin_defaults_cover_every_key() {
        let snapshot = PriceTableSnapshot::builtin_defaults(at());
        assert_eq!(snapshot.len(), PriceKey::ALL.len());
        assert_eq!(snapshot.freshness(), Freshness::Fallback);
    }

    #[test]
    fn test_is_fresh() {
        let ttl = chrono::Duration::minutes(30);
        let snapshot = PriceTableSnapshot::fresh(Vec::new(), at());
        assert!(snapshot.is_fresh(at() + chrono::Duration::minutes(29), ttl));
        assert!(!snapshot.is_fresh(at() + chrono::Duration::minutes(30), ttl));
        assert!(!snapshot.as_stale().is_fresh(at(), ttl));
        assert_eq!(snapshot.as_stale().as_of(), snapshot.as_of());
    }
}
