//! Sign configuration, price calculation and shipping selection.

mod configuration;
mod engine;
mod shipping;

pub use configuration::{
    ConfigurationError, DesignAspect, MAX_HEIGHT, MAX_MULTI_PART_WIDTH, MAX_WIDTH, MIN_WIDTH,
    SignConfiguration, SignConfigurationBuilder,
};
pub use engine::{LineItem, LineItemKind, PriceBreakdown, compute_total};
pub use shipping::{ShippingQuote, select_tier};
