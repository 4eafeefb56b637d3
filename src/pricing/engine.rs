//! Price calculation for a configured sign.
//!
//! [`compute_total`] is pure: the same configuration and snapshot always give
//! the same breakdown. Line items keep full precision and only the total is
//! rounded, so `total == round_2dp(sum of items)` holds exactly.
//!
//! Arithmetic never panics: a product that does not fit is recomputed with
//! the key's built-in default, and sums saturate.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::SignConfiguration;
use crate::prices::{Freshness, PriceKey, PriceTableSnapshot};
use crate::tiers::{self, PowerSupplyBand};
use crate::units;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Material,
    UvPrint,
    Led,
    Elements,
    Packaging,
    PowerSupply,
    Controller,
    Labor,
    HangingSystem,
    Waterproofing,
    MultiPart,
    Express,
    Admin,
}

impl LineItemKind {
    /// Items that make up the base subtotal, which percentage surcharges
    /// are computed against.
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            Self::Material
                | Self::UvPrint
                | Self::Led
                | Self::Elements
                | Self::Packaging
                | Self::PowerSupply
                | Self::Controller
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Material => "Material",
            Self::UvPrint => "UV print",
            Self::Led => "LED strip",
            Self::Elements => "Elements",
            Self::Packaging => "Packaging",
            Self::PowerSupply => "Power supply",
            Self::Controller => "Controller",
            Self::Labor => "Labor",
            Self::HangingSystem => "Hanging system",
            Self::Waterproofing => "Waterproofing surcharge",
            Self::MultiPart => "Multi-part surcharge",
            Self::Express => "Express production surcharge",
            Self::Admin => "Administration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    /// Every item in calculation order, including zero-valued options.
    pub items: Vec<LineItem>,
    /// Face area in square metres.
    pub area: Decimal,
    /// LED strip length in metres.
    pub led_length: Decimal,
    pub power_watts: u32,
    pub power_band: PowerSupplyBand,
    pub base_subtotal: Decimal,
    /// Freshness of the prices this breakdown was computed from.
    pub freshness: Freshness,
    pub total: Decimal,
}

impl PriceBreakdown {
    pub fn amount(&self, kind: LineItemKind) -> Decimal {
        self.items
            .iter()
            .filter(|item| item.kind == kind)
            .map(|item| item.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Unrounded sum of all line items.
    pub fn items_sum(&self) -> Decimal {
        sum(&self.items)
    }
}

fn sum(items: &[LineItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.amount)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn compute_total(config: &SignConfiguration, snapshot: &PriceTableSnapshot) -> PriceBreakdown {
    let design = config.design();
    let price = |key: PriceKey| snapshot.price(key);
    let when = |flag: bool, amount: Decimal| if flag { amount } else { Decimal::ZERO };
    let times = |quantity: Decimal, key: PriceKey| {
        quantity
            .checked_mul(price(key))
            .unwrap_or_else(|| quantity.saturating_mul(key.default_value()))
    };

    let area = units::square_meters(config.width(), config.height());
    let led_length = units::led_length(
        design.base_led_length(),
        config.width(),
        config.height(),
        design.original_width(),
        design.original_height(),
    );
    let power_watts = units::power_draw(led_length);
    let power_band = *tiers::power_supply_for(power_watts);
    let elements = Decimal::from(design.element_count());

    let mut items = vec![
        LineItem {
            kind: LineItemKind::Material,
            amount: times(area, PriceKey::MaterialPerSquareMeter),
        },
        LineItem {
            kind: LineItemKind::UvPrint,
            amount: when(
                config.has_uv_print(),
                times(area, PriceKey::UvPrintPerSquareMeter),
            ),
        },
        LineItem {
            kind: LineItemKind::Led,
            amount: times(led_length, PriceKey::LedPerMeter),
        },
        LineItem {
            kind: LineItemKind::Elements,
            amount: times(elements, PriceKey::ElementUnitPrice),
        },
        LineItem {
            kind: LineItemKind::Packaging,
            amount: times(area, PriceKey::PackagingPerSquareMeter),
        },
        LineItem {
            kind: LineItemKind::PowerSupply,
            amount: power_band.price,
        },
        LineItem {
            kind: LineItemKind::Controller,
            amount: price(PriceKey::ControllerUnitPrice),
        },
    ];
    let base_subtotal = sum(&items);

    let labor_hours = times(area, PriceKey::LaborTimePerArea)
        .saturating_add(times(elements, PriceKey::LaborTimePerElement));
    let surcharge = |flag: bool, key: PriceKey| when(flag, times(base_subtotal, key));

    items.extend([
        LineItem {
            kind: LineItemKind::Labor,
            amount: times(labor_hours, PriceKey::LaborHourlyRate),
        },
        LineItem {
            kind: LineItemKind::HangingSystem,
            amount: when(
                config.has_hanging_system(),
                price(PriceKey::HangingSystemUnitPrice),
            ),
        },
        LineItem {
            kind: LineItemKind::Waterproofing,
            amount: surcharge(config.is_waterproof(), PriceKey::WaterproofSurchargeRate),
        },
        LineItem {
            kind: LineItemKind::MultiPart,
            amount: surcharge(config.is_multi_part(), PriceKey::MultiPartSurchargeRate),
        },
        LineItem {
            kind: LineItemKind::Express,
            amount: surcharge(
                config.is_express_production(),
                PriceKey::ExpressSurchargeRate,
            ),
        },
        LineItem {
            kind: LineItemKind::Admin,
            amount: times(base_subtotal, PriceKey::AdminSurchargeRate),
        },
    ]);

    let total = round_money(sum(&items));

    PriceBreakdown {
        items,
        area,
        led_length,
        power_watts,
        power_band,
        base_subtotal,
        freshness: snapshot.freshness(),
        total,
    }
}
