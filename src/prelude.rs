//! Common imports for pricing a sign.
//!
//! ```rust
//! use signage_pricing::prelude::*;
//! ```

pub use crate::Error;
pub use crate::Result;

pub use crate::clock::{Clock, SystemClock};
pub use crate::config::{ConfigBuilder, ConfigProvider, ConfigProviderExt, PricingSettings};
pub use crate::prices::{
    Freshness, PriceCacheService, PriceKey, PriceReferenceStore, PriceSource, PriceTableSnapshot,
    RefreshError,
};
pub use crate::pricing::{
    DesignAspect, PriceBreakdown, ShippingQuote, SignConfiguration, compute_total, select_tier,
};
pub use crate::tiers::ShippingTier;
