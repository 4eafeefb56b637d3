//! Runtime settings for the price cache, read from any [`ConfigProvider`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use directories::BaseDirs;
use secrecy::SecretString;
use url::Url;

use super::provider::{ConfigProvider, ConfigProviderExt};
use super::{ConfigError, ConfigResult, ValidationErrors};
use crate::clock::Clock;
use crate::prices::{
    DEFAULT_DAILY_QUOTA, DEFAULT_REQUEST_TIMEOUT, DEFAULT_ROW_LIMIT, DEFAULT_TTL, HttpPriceSource,
    PriceCacheService, PriceReferenceStore,
};

pub const ENDPOINT_KEY: &str = "pricing.endpoint";
pub const API_TOKEN_KEY: &str = "pricing.api_token";
pub const TIMEOUT_KEY: &str = "pricing.timeout_secs";
pub const TTL_KEY: &str = "pricing.ttl_secs";
pub const DAILY_QUOTA_KEY: &str = "pricing.daily_quota";
pub const ROW_LIMIT_KEY: &str = "pricing.row_limit";
pub const STORAGE_PATH_KEY: &str = "pricing.storage_path";

const APP_DIR: &str = "signage-pricing";
const STORE_FILE: &str = "prices.json";

#[derive(Debug, Clone)]
pub struct PricingSettings {
    pub endpoint: Url,
    pub api_token: Option<SecretString>,
    pub request_timeout: Duration,
    pub ttl: Duration,
    pub daily_quota: u32,
    pub row_limit: u32,
    pub storage_path: PathBuf,
}

impl PricingSettings {
    /// `<cache dir>/signage-pricing/prices.json`, when the platform has a
    /// cache directory.
    pub fn default_storage_path() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.cache_dir().join(APP_DIR).join(STORE_FILE))
    }

    /// Reads and validates every `pricing.*` key. All problems are reported
    /// together.
    pub async fn load(provider: &dyn ConfigProvider) -> ConfigResult<Self> {
        let mut errors = Vec::new();

        let endpoint = match provider.get_raw(ENDPOINT_KEY).await? {
            Some(raw) => match Url::parse(raw.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(url) => {
                    errors.push(ConfigError::invalid(
                        ENDPOINT_KEY,
                        format!("unsupported scheme '{}'", url.scheme()),
                    ));
                    None
                }
                Err(e) => {
                    errors.push(ConfigError::invalid(ENDPOINT_KEY, e.to_string()));
                    None
                }
            },
            None => {
                errors.push(ConfigError::NotFound {
                    key: ENDPOINT_KEY.into(),
                });
                None
            }
        };

        let api_token = provider
            .get_raw(API_TOKEN_KEY)
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let timeout_secs = positive(
            provider,
            TIMEOUT_KEY,
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
            &mut errors,
        )
        .await?;
        let ttl_secs = positive(provider, TTL_KEY, DEFAULT_TTL.as_secs(), &mut errors).await?;
        let daily_quota =
            positive(provider, DAILY_QUOTA_KEY, DEFAULT_DAILY_QUOTA, &mut errors).await?;
        let row_limit = positive(provider, ROW_LIMIT_KEY, DEFAULT_ROW_LIMIT, &mut errors).await?;

        let storage_path = match provider.get_raw(STORAGE_PATH_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => Some(PathBuf::from(raw.trim())),
            _ => {
                let path = Self::default_storage_path();
                if path.is_none() {
                    errors.push(ConfigError::invalid(
                        STORAGE_PATH_KEY,
                        "no cache directory available; set an explicit path",
                    ));
                }
                path
            }
        };

        match (endpoint, storage_path) {
            (Some(endpoint), Some(storage_path)) if errors.is_empty() => Ok(Self {
                endpoint,
                api_token,
                request_timeout: Duration::from_secs(timeout_secs),
                ttl: Duration::from_secs(ttl_secs),
                daily_quota,
                row_limit,
                storage_path,
            }),
            _ => Err(ConfigError::ValidationErrors(ValidationErrors(errors))),
        }
    }

    pub fn http_source(&self, clock: Arc<dyn Clock>) -> crate::Result<HttpPriceSource> {
        let mut builder = HttpPriceSource::builder(self.endpoint.clone())
            .timeout(self.request_timeout)
            .row_limit(self.row_limit)
            .clock(clock);
        if let Some(token) = &self.api_token {
            builder = builder.token(token.clone());
        }
        builder.build()
    }

    pub fn store(&self) -> PriceReferenceStore {
        PriceReferenceStore::file(&self.storage_path)
    }

    /// Wires source, store and quota into a ready service.
    pub fn service(&self, clock: Arc<dyn Clock>) -> crate::Result<PriceCacheService> {
        let source = self.http_source(clock.clone())?;
        Ok(PriceCacheService::builder(Arc::new(source))
            .store(self.store())
            .clock(clock)
            .ttl(self.ttl)
            .daily_quota(self.daily_quota)
            .request_timeout(self.request_timeout)
            .build())
    }
}

async fn positive<T>(
    provider: &dyn ConfigProvider,
    key: &str,
    default: T,
    errors: &mut Vec<ConfigError>,
) -> ConfigResult<T>
where
    T: FromStr + PartialOrd + Default + Copy + Send,
    T::Err: std::fmt::Display,
{
    match provider.get_parsed::<T>(key).await {
        Ok(Some(value)) if value > T::default() => Ok(value),
        Ok(Some(_)) => {
            errors.push(ConfigError::invalid(key, "must be greater than zero"));
            Ok(default)
        }
        Ok(None) => Ok(default),
        Err(e @ ConfigError::InvalidValue { .. }) => {
            errors.push(e);
            Ok(default)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;
    use secrecy::ExposeSecret;

    fn base() -> MemoryConfigProvider {
        MemoryConfigProvider::new()
            .value(ENDPOINT_KEY, "https://prices.example.com/api/v1/rows")
            .value(STORAGE_PATH_KEY, "/tmp/signage/prices.json")
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let settings = PricingSettings::load(&base()).await.unwrap();
        assert_eq!(settings.request_timeout, Duration::from_secs(8));
        assert_eq!(settings.ttl, Duration::from_secs(1800));
        assert_eq!(settings.daily_quota, 100);
        assert_eq!(settings.row_limit, 1000);
        assert!(settings.api_token.is_none());
        assert_eq!(
            settings.storage_path,
            PathBuf::from("/tmp/signage/prices.json")
        );
    }

    #[tokio::test]
    async fn test_overrides_and_token() {
        let provider = base()
            .value(API_TOKEN_KEY, "secret-token")
            .value(TTL_KEY, "60")
            .value(DAILY_QUOTA_KEY, "\"5\"");
        let settings = PricingSettings::load(&provider).await.unwrap();
        assert_eq!(settings.ttl, Duration::from_secs(60));
        assert_eq!(settings.daily_quota, 5);
        assert_eq!(
            settings.api_token.as_ref().map(|t| t.expose_secret()),
            Some("secret-token")
        );
    }

    #[tokio::test]
    async fn test_collects_all_problems() {
        let provider = MemoryConfigProvider::new()
            .value(STORAGE_PATH_KEY, "/tmp/p.json")
            .value(TIMEOUT_KEY, "0")
            .value(DAILY_QUOTA_KEY, "many");
        let Err(ConfigError::ValidationErrors(errors)) = PricingSettings::load(&provider).await
        else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.0.len(), 3);
        let text = errors.to_string();
        assert!(text.contains(ENDPOINT_KEY));
        assert!(text.contains(TIMEOUT_KEY));
        assert!(text.contains(DAILY_QUOTA_KEY));
    }

    #[tokio::test]
    async fn test_rejects_non_http_endpoint() {
        let provider = MemoryConfigProvider::new()
            .value(ENDPOINT_KEY, "ftp://prices.example.com")
            .value(STORAGE_PATH_KEY, "/tmp/p.json");
        assert!(PricingSettings::load(&provider).await.is_err());
    }

    #[tokio::test]
    async fn test_http_source_carries_row_limit() {
        let provider = base().value(ROW_LIMIT_KEY, "250");
        let settings = PricingSettings::load(&provider).await.unwrap();
        let source = settings
            .http_source(Arc::new(crate::clock::SystemClock))
            .unwrap();
        assert_eq!(source.endpoint().query(), Some("limit=250"));
    }
}
