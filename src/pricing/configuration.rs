//! Validated sign configurations.
//!
//! Height is never set directly: it follows from the width and the design's
//! aspect ratio, so a configuration can't drift out of proportion.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

use crate::units;

pub const MIN_WIDTH: Decimal = dec!(30);
pub const MAX_WIDTH: Decimal = dec!(300);
/// Upper width bound once the sign is produced in several parts.
pub const MAX_MULTI_PART_WIDTH: Decimal = dec!(1000);
/// Ceiling on derived height for single-part signs.
pub const MAX_HEIGHT: Decimal = dec!(200);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Design {field} must be positive, got {value}")]
    InvalidDesign { field: &'static str, value: Decimal },

    #[error("Width {width} cm outside {min}..={max} cm")]
    WidthOutOfRange {
        width: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Height {height} cm exceeds {max} cm; enable multi-part production")]
    HeightExceeded { height: Decimal, max: Decimal },
}

/// Reference geometry of a design as drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DesignAspect {
    original_width: Decimal,
    original_height: Decimal,
    base_led_length: Decimal,
    element_count: u32,
}

impl DesignAspect {
    pub fn new(
        original_width: Decimal,
        original_height: Decimal,
        base_led_length: Decimal,
        element_count: u32,
    ) -> Result<Self, ConfigurationError> {
        for (field, value) in [
            ("original_width", original_width),
            ("original_height", original_height),
            ("base_led_length", base_led_length),
        ] {
            if value <= Decimal::ZERO {
                return Err(ConfigurationError::InvalidDesign { field, value });
            }
        }
        Ok(Self {
            original_width,
            original_height,
            base_led_length,
            element_count,
        })
    }

    pub fn original_width(&self) -> Decimal {
        self.original_width
    }

    pub fn original_height(&self) -> Decimal {
        self.original_height
    }

    /// LED strip length of the design at its original size, in metres.
    pub fn base_led_length(&self) -> Decimal {
        self.base_led_length
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn height_for(&self, width: Decimal) -> Decimal {
        units::derive_height(width, self.original_width, self.original_height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignConfiguration {
    design: DesignAspect,
    width: Decimal,
    height: Decimal,
    is_waterproof: bool,
    is_multi_part: bool,
    has_uv_print: bool,
    has_hanging_system: bool,
    is_express_production: bool,
}

impl SignConfiguration {
    /// Starts at the design's original width with every option off.
    pub fn builder(design: DesignAspect) -> SignConfigurationBuilder {
        SignConfigurationBuilder {
            design,
            width: design.original_width,
            is_waterproof: false,
            is_multi_part: false,
            has_uv_print: false,
            has_hanging_system: false,
            is_express_production: false,
        }
    }

    /// Same options at a new width.
    pub fn resized(&self, width: Decimal) -> Result<Self, ConfigurationError> {
        self.to_builder().width(width).build()
    }

    pub fn to_builder(&self) -> SignConfigurationBuilder {
        SignConfigurationBuilder {
            design: self.design,
            width: self.width,
            is_waterproof: self.is_waterproof,
            is_multi_part: self.is_multi_part,
            has_uv_print: self.has_uv_print,
            has_hanging_system: self.has_hanging_system,
            is_express_production: self.is_express_production,
        }
    }

    pub fn design(&self) -> &DesignAspect {
        &self.design
    }

    pub fn width(&self) -> Decimal {
        self.width
    }

    pub fn height(&self) -> Decimal {
        self.height
    }

    pub fn longest_side(&self) -> Decimal {
        self.width.max(self.height)
    }

    pub fn is_waterproof(&self) -> bool {
        self.is_waterproof
    }

    pub fn is_multi_part(&self) -> bool {
        self.is_multi_part
    }

    pub fn has_uv_print(&self) -> bool {
        self.has_uv_print
    }

    pub fn has_hanging_system(&self) -> bool {
        self.has_hanging_system
    }

    pub fn is_express_production(&self) -> bool {
        self.is_express_production
    }
}

#[derive(Debug, Clone)]
pub struct SignConfigurationBuilder {
    design: DesignAspect,
    width: Decimal,
    is_waterproof: bool,
    is_multi_part: bool,
    has_uv_print: bool,
    has_hanging_system: bool,
    is_express_production: bool,
}

impl SignConfigurationBuilder {
    pub fn width(mut self, width: Decimal) -> Self {
        self.width = width;
        self
    }

    pub fn waterproof(mut self, enabled: bool) -> Self {
        self.is_waterproof = enabled;
        self
    }

    pub fn multi_part(mut self, enabled: bool) -> Self {
        self.is_multi_part = enabled;
        self
    }

    pub fn uv_print(mut self, enabled: bool) -> Self {
        self.has_uv_print = enabled;
        self
    }

    pub fn hanging_system(mut self, enabled: bool) -> Self {
        self.has_hanging_system = enabled;
        self
    }

    pub fn express_production(mut self, enabled: bool) -> Self {
        self.is_express_production = enabled;
        self
    }

    pub fn build(self) -> Result<SignConfiguration, ConfigurationError> {
        let max_width = if self.is_multi_part {
            MAX_MULTI_PART_WIDTH
        } else {
            MAX_WIDTH
        };
        if self.width < MIN_WIDTH || self.width > max_width {
            return Err(ConfigurationError::WidthOutOfRange {
                width: self.width,
                min: MIN_WIDTH,
                max: max_width,
            });
        }

        let height = self.design.height_for(self.width);
        if !self.is_multi_part && height > MAX_HEIGHT {
            return Err(ConfigurationError::HeightExceeded {
                height,
                max: MAX_HEIGHT,
            });
        }

        Ok(SignConfiguration {
            design: self.design,
            width: self.width,
            height,
            is_waterproof: self.is_waterproof,
            is_multi_part: self.is_multi_part,
            has_uv_print: self.has_uv_print,
            has_hanging_system: self.has_hanging_system,
            is_express_production: self.is_express_production,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_design() -> DesignAspect {
        DesignAspect::new(dec!(200), dec!(60), dec!(5.2), 1).unwrap()
    }

    #[test]
    fn test_height_follows_width() {
        let config = SignConfiguration::builder(wide_design())
            .width(dec!(100))
            .build()
            .unwrap();
        assert_eq!(config.height(), dec!(30));
        assert_eq!(config.longest_side(), dec!(100));
    }

    #[test]
    fn test_height_monotone_in_width() {
        let design = DesignAspect::new(dec!(137), dec!(89), dec!(3), 2).unwrap();
        let mut previous = Decimal::ZERO;
        for w in 30..=300 {
            let config = SignConfiguration::builder(design)
                .width(Decimal::from(w))
                .multi_part(true)
                .build()
                .unwrap();
            assert!(config.height() >= previous);
            let exact = Decimal::from(w) * dec!(89) / dec!(137);
            assert!((config.height() - exact).abs() <= dec!(0.5));
            previous = config.height();
        }
    }

    #[test]
    fn test_width_bounds() {
        let design = wide_design();
        let err = SignConfiguration::builder(design)
            .width(dec!(29))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::WidthOutOfRange { .. }));

        assert!(
            SignConfiguration::builder(design)
                .width(dec!(301))
                .build()
                .is_err()
        );
        assert!(
            SignConfiguration::builder(design)
                .width(dec!(301))
                .multi_part(true)
                .build()
                .is_ok()
        );
        assert!(
            SignConfiguration::builder(design)
                .width(dec!(1001))
                .multi_part(true)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_height_ceiling_unless_multi_part() {
        let tall = DesignAspect::new(dec!(50), dec!(100), dec!(2), 1).unwrap();
        let err = SignConfiguration::builder(tall)
            .width(dec!(120))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::HeightExceeded {
                height: dec!(240),
                max: MAX_HEIGHT
            }
        );

        let split = SignConfiguration::builder(tall)
            .width(dec!(120))
            .multi_part(true)
            .build()
            .unwrap();
        assert_eq!(split.height(), dec!(240));
    }

    #[test]
    fn test_invalid_design() {
        assert!(DesignAspect::new(dec!(0), dec!(60), dec!(1), 1).is_err());
        assert!(DesignAspect::new(dec!(200), dec!(60), dec!(-1), 1).is_err());
    }

    #[test]
    fn test_resized_keeps_options() {
        let config = SignConfiguration::builder(wide_design())
            .waterproof(true)
            .express_production(true)
            .build()
            .unwrap();
        let smaller = config.resized(dec!(50)).unwrap();
        assert!(smaller.is_waterproof());
        assert!(smaller.is_express_production());
        assert_eq!(smaller.height(), dec!(15));
    }
}
