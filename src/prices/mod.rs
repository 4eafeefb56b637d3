//! Price reference data: keys, snapshots, persistence, quota, fetching and
//! the cache that ties them together.

mod key;
mod quota;
mod service;
mod snapshot;
mod source;
mod store;

pub use key::PriceKey;
pub use quota::{DEFAULT_DAILY_QUOTA, QuotaGuard, QuotaState};
pub use service::{DEFAULT_TTL, PriceCacheService, PriceCacheServiceBuilder, RefreshError};
pub use snapshot::{Freshness, PriceEntry, PriceTableSnapshot};
pub use source::{
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_ROW_LIMIT, FetchError, FetchErrorKind, HttpPriceSource,
    HttpPriceSourceBuilder, KEY_FIELDS, PriceSource, UNIT_FIELDS, VALUE_FIELDS, parse_price_rows,
};
pub use store::{FETCHED_AT_KEY, PriceReferenceStore, TABLE_KEY};
