//! # signage-pricing
//!
//! Pricing for custom-sized illuminated signs: a price reference cache in
//! front of a slow, rate-limited pricing backend, and a deterministic engine
//! that turns a sign configuration into an auditable price breakdown.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rust_decimal_macros::dec;
//! use signage_pricing::{ConfigBuilder, DesignAspect, PricingSettings, SignConfiguration, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), signage_pricing::Error> {
//!     let config = ConfigBuilder::new().env().build().await?;
//!     let settings = PricingSettings::load(&config).await?;
//!     let prices = settings.service(Arc::new(SystemClock))?;
//!
//!     let design = DesignAspect::new(dec!(200), dec!(60), dec!(5.2), 1)?;
//!     let sign = SignConfiguration::builder(design)
//!         .width(dec!(100))
//!         .waterproof(true)
//!         .build()?;
//!
//!     let breakdown = prices.quote(&sign).await;
//!     let shipping = prices.shipping_quote(sign.longest_side()).await;
//!     println!("{} EUR + {} EUR shipping ({})", breakdown.total, shipping.price, shipping.tier);
//!     Ok(())
//! }
//! ```
//!
//! Price lookups never fail: when the backend is down, slow or over its
//! daily quota, the cache serves the last known table marked
//! [`Freshness::Stale`], or built-in defaults marked [`Freshness::Fallback`].
//! Only [`PriceCacheService::force_refresh`] reports fetch failures.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod clock;
pub mod config;
pub mod observability;
pub mod prelude;
pub mod prices;
pub mod pricing;
pub mod tiers;
pub mod units;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CompositeConfigProvider, ConfigBuilder, ConfigError, ConfigProvider, ConfigProviderExt,
    EnvConfigProvider, FileConfigProvider, MemoryConfigProvider, PricingSettings,
};
pub use observability::{CacheMetrics, MetricsSummary};
pub use prices::{
    FetchError, FetchErrorKind, Freshness, HttpPriceSource, PriceCacheService, PriceEntry,
    PriceKey, PriceReferenceStore, PriceSource, PriceTableSnapshot, QuotaGuard, QuotaState,
    RefreshError,
};
pub use pricing::{
    ConfigurationError, DesignAspect, LineItem, LineItemKind, PriceBreakdown, ShippingQuote,
    SignConfiguration, compute_total, select_tier,
};
pub use tiers::{PowerSupplyBand, ShippingTier};

/// Error type for signage-pricing operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sign dimensions or options rejected.
    #[error("Invalid sign configuration: {0}")]
    Configuration(#[from] pricing::ConfigurationError),

    /// Could not build the HTTP client.
    #[error("Network setup failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Price fetch failed: {0}")]
    Fetch(#[from] prices::FetchError),

    #[error("Price refresh failed: {0}")]
    Refresh(#[from] prices::RefreshError),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Settings or sign configuration the caller must fix
    Configuration,
    /// Backend unreachable or slow; may succeed on retry
    Transient,
    /// Backend answered with something unusable
    Upstream,
    /// Daily fetch quota used up
    ResourceLimit,
    /// IO, JSON or other unexpected failures
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::Configuration(_) | Error::Env(_) => {
                ErrorCategory::Configuration
            }
            Error::Network(_) => ErrorCategory::Transient,
            Error::Fetch(e) | Error::Refresh(prices::RefreshError::Fetch(e)) => match e.kind() {
                prices::FetchErrorKind::Transport => ErrorCategory::Transient,
                prices::FetchErrorKind::Semantic => ErrorCategory::Upstream,
            },
            Error::Refresh(prices::RefreshError::QuotaExhausted { .. }) => {
                ErrorCategory::ResourceLimit
            }
            Error::Json(_) | Error::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn is_resource_limit(&self) -> bool {
        self.category() == ErrorCategory::ResourceLimit
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Fetch(prices::FetchError::Status { status, .. })
            | Error::Refresh(prices::RefreshError::Fetch(prices::FetchError::Status {
                status,
                ..
            })) => Some(*status),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound { key } => {
                Error::Config(format!("Key not found: {}", key))
            }
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::Env(e) => Error::Env(e),
            config::ConfigError::Provider { message } => Error::Config(message),
            config::ConfigError::ValidationErrors(errors) => Error::Config(errors.to_string()),
        }
    }
}

/// Result type alias for signage-pricing operations.
pub type Result<T> = std::result::Result<T, Error>;
