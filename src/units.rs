//! Proportional scaling between sign dimensions, LED length and power draw.
//!
//! All lengths are centimetres except LED strip length, which is metres.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Power draw of one metre of LED strip, in watts.
pub const WATTS_PER_LED_METER: Decimal = dec!(12);

/// LED strips are never priced shorter than this, in metres.
pub const MIN_LED_LENGTH: Decimal = dec!(1);

const SQUARE_CM_PER_SQUARE_M: Decimal = dec!(10000);

fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Scales `value` by the ratio `to / from`. A zero `from` leaves the value unscaled.
pub fn scale(value: Decimal, from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return value;
    }
    value * to / from
}

/// Height that keeps the design's aspect ratio at `width`, in whole centimetres.
pub fn derive_height(width: Decimal, original_width: Decimal, original_height: Decimal) -> Decimal {
    round_half_up(scale(original_height, original_width, width), 0)
}

pub fn perimeter(width: Decimal, height: Decimal) -> Decimal {
    (width + height) * dec!(2)
}

pub fn square_meters(width: Decimal, height: Decimal) -> Decimal {
    width * height / SQUARE_CM_PER_SQUARE_M
}

/// LED strip length for a resized design.
///
/// The design's base length is scaled by the perimeter ratio, rounded to one
/// decimal and floored at [`MIN_LED_LENGTH`].
pub fn led_length(
    base_led_length: Decimal,
    width: Decimal,
    height: Decimal,
    original_width: Decimal,
    original_height: Decimal,
) -> Decimal {
    let scaled = scale(
        base_led_length,
        perimeter(original_width, original_height),
        perimeter(width, height),
    );
    round_half_up(scaled, 1).max(MIN_LED_LENGTH)
}

/// Power draw in whole watts for `led_length` metres of strip.
pub fn power_draw(led_length: Decimal) -> u32 {
    round_half_up(led_length * WATTS_PER_LED_METER, 0)
        .to_u32()
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_height_keeps_aspect() {
        assert_eq!(derive_height(dec!(100), dec!(200), dec!(60)), dec!(30));
        assert_eq!(derive_height(dec!(300), dec!(200), dec!(60)), dec!(90));
        // 45 * 60 / 200 = 13.5 rounds up
        assert_eq!(derive_height(dec!(45), dec!(200), dec!(60)), dec!(14));
    }

    #[test]
    fn test_derive_height_monotonic() {
        let mut previous = Decimal::ZERO;
        for width in 30..=300 {
            let height = derive_height(Decimal::from(width), dec!(170), dec!(47));
            assert!(height >= previous, "height dropped at width {}", width);
            previous = height;
        }
    }

    #[test]
    fn test_led_length_scales_by_perimeter() {
        let length = led_length(dec!(5.2), dec!(100), dec!(30), dec!(200), dec!(60));
        assert_eq!(length, dec!(2.6));
        assert_eq!(power_draw(length), 31);
    }

    #[test]
    fn test_led_length_floor() {
        let length = led_length(dec!(2), dec!(30), dec!(9), dec!(200), dec!(60));
        assert_eq!(length, MIN_LED_LENGTH);
        assert_eq!(power_draw(length), 12);
    }

    #[test]
    fn test_square_meters() {
        assert_eq!(square_meters(dec!(100), dec!(30)), dec!(0.3));
    }

    #[test]
    fn test_scale_zero_source() {
        assert_eq!(scale(dec!(7), Decimal::ZERO, dec!(3)), dec!(7));
    }
}
