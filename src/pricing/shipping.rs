//! Shipping tier selection by longest side.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::prices::PriceTableSnapshot;
use crate::tiers::ShippingTier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub tier: ShippingTier,
    pub price: Decimal,
    pub label: &'static str,
}

/// Picks the first tier whose inclusive bound covers `longest_side_cm`,
/// priced from the snapshot or the tier's default.
pub fn select_tier(longest_side_cm: Decimal, snapshot: &PriceTableSnapshot) -> ShippingQuote {
    let tier = ShippingTier::for_longest_side(longest_side_cm);
    ShippingQuote {
        tier,
        price: snapshot.price(tier.price_key()),
        label: tier.label(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::{PriceEntry, PriceKey};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn snapshot() -> PriceTableSnapshot {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceTableSnapshot::fresh(
            vec![PriceEntry::new(PriceKey::ShippingM, dec!(44.50), at)],
            at,
        )
    }

    #[test]
    fn test_boundaries() {
        let snapshot = snapshot();
        assert_eq!(select_tier(dec!(20), &snapshot).tier, ShippingTier::Xs);
        assert_eq!(select_tier(dec!(60), &snapshot).tier, ShippingTier::S);
        assert_eq!(select_tier(dec!(61), &snapshot).tier, ShippingTier::M);
        assert_eq!(select_tier(dec!(65), &snapshot).tier, ShippingTier::M);
        assert_eq!(select_tier(dec!(120), &snapshot).tier, ShippingTier::L);
        assert_eq!(select_tier(dec!(120.5), &snapshot).tier, ShippingTier::Xl);
    }

    #[test]
    fn test_price_from_snapshot_or_default() {
        let snapshot = snapshot();
        let m = select_tier(dec!(65), &snapshot);
        assert_eq!(m.price, dec!(44.50));
        assert_eq!(m.label, "over 60 up to 100 cm");

        let xl = select_tier(dec!(400), &snapshot);
        assert_eq!(xl.price, PriceKey::ShippingXl.default_value());
    }
}
