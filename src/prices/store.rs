//! Persisted price table.
//!
//! Two entries in a key-value [`ConfigProvider`]: the table itself and the
//! time it was fetched. Saving removes the timestamp first and writes it
//! last, and loading requires both, so an interrupted save reads back as
//! "nothing persisted" rather than as a half-written table.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{PriceEntry, PriceKey, PriceTableSnapshot};
use crate::config::{
    ConfigError, ConfigProvider, ConfigProviderExt, ConfigResult, FileConfigProvider,
    MemoryConfigProvider,
};

pub const TABLE_KEY: &str = "price_table";
pub const FETCHED_AT_KEY: &str = "price_table_fetched_at";

#[derive(Clone)]
pub struct PriceReferenceStore {
    provider: Arc<dyn ConfigProvider>,
}

impl PriceReferenceStore {
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self { provider }
    }

    /// Non-persistent store; contents live as long as the handle.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryConfigProvider::named("price-store")))
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileConfigProvider::new(path.as_ref())))
    }

    /// Last persisted table as a [`Freshness::Fresh`](super::Freshness)
    /// snapshot stamped with its fetch time. `None` unless both entries are
    /// present.
    pub async fn load(&self) -> ConfigResult<Option<PriceTableSnapshot>> {
        let Some(raw_at) = self.provider.get_raw(FETCHED_AT_KEY).await? else {
            return Ok(None);
        };
        let Some(table) = self
            .provider
            .get::<BTreeMap<PriceKey, PriceEntry>>(TABLE_KEY)
            .await?
        else {
            return Ok(None);
        };

        let fetched_at = DateTime::parse_from_rfc3339(raw_at.trim().trim_matches('"'))
            .map_err(|e| ConfigError::invalid(FETCHED_AT_KEY, e.to_string()))?
            .with_timezone(&Utc);
        debug!(entries = table.len(), %fetched_at, "loaded persisted price table");
        Ok(Some(PriceTableSnapshot::fresh(
            table.into_values(),
            fetched_at,
        )))
    }

    pub async fn save(&self, snapshot: &PriceTableSnapshot) -> ConfigResult<()> {
        self.provider.delete(FETCHED_AT_KEY).await?;
        self.provider.set(TABLE_KEY, snapshot.entry_map()).await?;
        self.provider
            .set_raw(FETCHED_AT_KEY, &snapshot.as_of().to_rfc3339())
            .await
    }

    pub async fn clear(&self) -> ConfigResult<()> {
        self.provider.delete(FETCHED_AT_KEY).await?;
        self.provider.delete(TABLE_KEY).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PriceReferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceReferenceStore")
            .field("provider", &self.provider.name())
            .finish()
    }
}
