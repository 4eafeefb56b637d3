//! Static ordered band tables for power supplies and shipping.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::prices::PriceKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSupplyBand {
    pub min_watt: u32,
    pub max_watt: u32,
    pub price: Decimal,
}

impl PowerSupplyBand {
    const fn new(min_watt: u32, max_watt: u32, price: Decimal) -> Self {
        Self {
            min_watt,
            max_watt,
            price,
        }
    }

    pub fn contains(&self, watts: u32) -> bool {
        self.min_watt <= watts && watts <= self.max_watt
    }
}

/// Power supply prices by wattage band, ascending and contiguous.
pub const POWER_SUPPLY_BANDS: [PowerSupplyBand; 7] = [
    PowerSupplyBand::new(0, 30, dec!(15.00)),
    PowerSupplyBand::new(31, 60, dec!(22.00)),
    PowerSupplyBand::new(61, 100, dec!(30.00)),
    PowerSupplyBand::new(101, 150, dec!(42.00)),
    PowerSupplyBand::new(151, 200, dec!(55.00)),
    PowerSupplyBand::new(201, 300, dec!(75.00)),
    PowerSupplyBand::new(301, 480, dec!(98.00)),
];

/// First band containing `watts`; anything above the table clamps to the top band.
pub fn power_supply_for(watts: u32) -> &'static PowerSupplyBand {
    POWER_SUPPLY_BANDS
        .iter()
        .find(|band| band.contains(watts))
        .unwrap_or(&POWER_SUPPLY_BANDS[POWER_SUPPLY_BANDS.len() - 1])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShippingTier {
    Xs,
    S,
    M,
    L,
    Xl,
}

impl ShippingTier {
    /// Tiers in lookup order.
    pub const ALL: [ShippingTier; 5] = [Self::Xs, Self::S, Self::M, Self::L, Self::Xl];

    /// Inclusive upper bound of the longest side in cm; `None` for the open top tier.
    pub fn max_side_cm(&self) -> Option<Decimal> {
        match self {
            Self::Xs => Some(dec!(20)),
            Self::S => Some(dec!(60)),
            Self::M => Some(dec!(100)),
            Self::L => Some(dec!(120)),
            Self::Xl => None,
        }
    }

    pub fn for_longest_side(longest_side_cm: Decimal) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| {
                tier.max_side_cm()
                    .is_none_or(|max_side| longest_side_cm <= max_side)
            })
            .unwrap_or(Self::Xl)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Xs => "XS",
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::Xl => "XL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Xs => "up to 20 cm",
            Self::S => "over 20 up to 60 cm",
            Self::M => "over 60 up to 100 cm",
            Self::L => "over 100 up to 120 cm",
            Self::Xl => "over 120 cm",
        }
    }

    pub fn price_key(&self) -> PriceKey {
        match self {
            Self::Xs => PriceKey::ShippingXs,
            Self::S => PriceKey::ShippingS,
            Self::M => PriceKey::ShippingM,
            Self::L => PriceKey::ShippingL,
            Self::Xl => PriceKey::ShippingXl,
        }
    }
}

impl std::fmt::Display for ShippingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
