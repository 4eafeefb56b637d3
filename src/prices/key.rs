//! Closed vocabulary of price keys with built-in defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceKey {
    #[serde(rename = "material_per_m2")]
    MaterialPerSquareMeter,
    #[serde(rename = "uv_print_per_m2")]
    UvPrintPerSquareMeter,
    #[serde(rename = "led_per_m")]
    LedPerMeter,
    ElementUnitPrice,
    #[serde(rename = "packaging_per_m2")]
    PackagingPerSquareMeter,
    ControllerUnitPrice,
    HangingSystemUnitPrice,
    LaborHourlyRate,
    #[serde(rename = "labor_time_per_m2")]
    LaborTimePerArea,
    LaborTimePerElement,
    WaterproofSurchargeRate,
    MultiPartSurchargeRate,
    ExpressSurchargeRate,
    AdminSurchargeRate,
    ShippingXs,
    ShippingS,
    ShippingM,
    ShippingL,
    ShippingXl,
}

impl PriceKey {
    pub const ALL: [PriceKey; 19] = [
        Self::MaterialPerSquareMeter,
        Self::UvPrintPerSquareMeter,
        Self::LedPerMeter,
        Self::ElementUnitPrice,
        Self::PackagingPerSquareMeter,
        Self::ControllerUnitPrice,
        Self::HangingSystemUnitPrice,
        Self::LaborHourlyRate,
        Self::LaborTimePerArea,
        Self::LaborTimePerElement,
        Self::WaterproofSurchargeRate,
        Self::MultiPartSurchargeRate,
        Self::ExpressSurchargeRate,
        Self::AdminSurchargeRate,
        Self::ShippingXs,
        Self::ShippingS,
        Self::ShippingM,
        Self::ShippingL,
        Self::ShippingXl,
    ];

    /// Identifier used by the pricing backend and the persisted table.
    pub fn wire_id(&self) -> &'static str {
        match self {
            Self::MaterialPerSquareMeter => "material_per_m2",
            Self::UvPrintPerSquareMeter => "uv_print_per_m2",
            Self::LedPerMeter => "led_per_m",
            Self::ElementUnitPrice => "element_unit_price",
            Self::PackagingPerSquareMeter => "packaging_per_m2",
            Self::ControllerUnitPrice => "controller_unit_price",
            Self::HangingSystemUnitPrice => "hanging_system_unit_price",
            Self::LaborHourlyRate => "labor_hourly_rate",
            Self::LaborTimePerArea => "labor_time_per_m2",
            Self::LaborTimePerElement => "labor_time_per_element",
            Self::WaterproofSurchargeRate => "waterproof_surcharge_rate",
            Self::MultiPartSurchargeRate => "multi_part_surcharge_rate",
            Self::ExpressSurchargeRate => "express_surcharge_rate",
            Self::AdminSurchargeRate => "admin_surcharge_rate",
            Self::ShippingXs => "shipping_xs",
            Self::ShippingS => "shipping_s",
            Self::ShippingM => "shipping_m",
            Self::ShippingL => "shipping_l",
            Self::ShippingXl => "shipping_xl",
        }
    }

    /// Value used when neither a live nor a persisted price is available.
    pub fn default_value(&self) -> Decimal {
        match self {
            Self::MaterialPerSquareMeter => dec!(120.00),
            Self::UvPrintPerSquareMeter => dec!(60.00),
            Self::LedPerMeter => dec!(8.50),
            Self::ElementUnitPrice => dec!(5.00),
            Self::PackagingPerSquareMeter => dec!(15.00),
            Self::ControllerUnitPrice => dec!(25.00),
            Self::HangingSystemUnitPrice => dec!(35.00),
            Self::LaborHourlyRate => dec!(45.00),
            Self::LaborTimePerArea => dec!(1.50),
            Self::LaborTimePerElement => dec!(0.25),
            Self::WaterproofSurchargeRate => dec!(0.25),
            Self::MultiPartSurchargeRate => dec!(0.15),
            Self::ExpressSurchargeRate => dec!(0.30),
            Self::AdminSurchargeRate => dec!(0.10),
            Self::ShippingXs => dec!(9.90),
            Self::ShippingS => dec!(19.90),
            Self::ShippingM => dec!(39.90),
            Self::ShippingL => dec!(59.90),
            Self::ShippingXl => dec!(129.00),
        }
    }

    /// Largest value accepted from the backend or the store. Anything above
    /// it is treated as missing.
    pub fn max_value(&self) -> Decimal {
        match self {
            Self::WaterproofSurchargeRate
            | Self::MultiPartSurchargeRate
            | Self::ExpressSurchargeRate
            | Self::AdminSurchargeRate => dec!(10),
            Self::LaborTimePerArea | Self::LaborTimePerElement => dec!(1000),
            _ => dec!(1_000_000_000),
        }
    }

    pub fn default_unit(&self) -> Option<&'static str> {
        match self {
            Self::MaterialPerSquareMeter
            | Self::UvPrintPerSquareMeter
            | Self::PackagingPerSquareMeter => Some("EUR/m2"),
            Self::LedPerMeter => Some("EUR/m"),
            Self::LaborHourlyRate => Some("EUR/h"),
            Self::LaborTimePerArea => Some("h/m2"),
            Self::LaborTimePerElement => Some("h"),
            Self::WaterproofSurchargeRate
            | Self::MultiPartSurchargeRate
            | Self::ExpressSurchargeRate
            | Self::AdminSurchargeRate => None,
            _ => Some("EUR"),
        }
    }

    /// Resolves a backend row name. Matching ignores case and treats `-` and
    /// spaces as `_`.
    pub fn from_wire(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .into_iter()
            .find(|key| key.wire_id() == normalized)
    }
}

impl std::fmt::Display for PriceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_id())
    }
}
