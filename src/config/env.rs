//! Environment variable provider.
//!
//! Keys map to upper-case variable names with `.` replaced by `_`, so
//! `pricing.endpoint` becomes `SIGN_PRICING_PRICING_ENDPOINT` under the
//! default prefix. Read-only: mutating the environment at runtime is not
//! thread-safe.

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

pub const DEFAULT_ENV_PREFIX: &str = "SIGN_PRICING_";

#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    prefix: String,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::prefixed(DEFAULT_ENV_PREFIX)
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn env_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase().replace('.', "_"))
    }

    fn key_from_env(&self, env_name: &str) -> Option<String> {
        env_name
            .strip_prefix(&self.prefix)
            .map(|rest| rest.to_lowercase().replace('_', "."))
    }

    fn read_only() -> ConfigError {
        ConfigError::Provider {
            message: "environment variables are read-only at runtime".into(),
        }
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.env_key(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }

    async fn set_raw(&self, _key: &str, _value: &str) -> ConfigResult<()> {
        Err(Self::read_only())
    }

    async fn delete(&self, _key: &str) -> ConfigResult<bool> {
        Err(Self::read_only())
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let env_prefix = self.env_key(prefix);
        Ok(std::env::vars()
            .filter(|(k, _)| k.starts_with(&env_prefix))
            .filter_map(|(k, _)| self.key_from_env(&k))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_conversion() {
        let provider = EnvConfigProvider::new();
        assert_eq!(
            provider.env_key("pricing.endpoint"),
            "SIGN_PRICING_PRICING_ENDPOINT"
        );

        let provider = EnvConfigProvider::prefixed("SHOP_");
        assert_eq!(provider.env_key("pricing.ttl_secs"), "SHOP_PRICING_TTL_SECS");
        assert_eq!(
            provider.key_from_env("SHOP_PRICING_ENDPOINT").as_deref(),
            Some("pricing.endpoint")
        );
        assert_eq!(provider.key_from_env("OTHER_PRICING"), None);
    }

    #[tokio::test]
    async fn test_env_provider_get() {
        let provider = EnvConfigProvider::prefixed("SIGN_PRICING_TEST_GET_");

        // SAFETY: test-only variable with a prefix no other test uses
        unsafe { std::env::set_var("SIGN_PRICING_TEST_GET_PRICING_DAILY_QUOTA", "42") };
        let value = provider.get_raw("pricing.daily_quota").await.unwrap();
        assert_eq!(value.as_deref(), Some("42"));
        unsafe { std::env::remove_var("SIGN_PRICING_TEST_GET_PRICING_DAILY_QUOTA") };
    }

    #[tokio::test]
    async fn test_env_provider_read_only() {
        let provider = EnvConfigProvider::new();
        assert!(provider.set_raw("key", "value").await.is_err());
        assert!(provider.delete("key").await.is_err());
    }

    #[tokio::test]
    async fn test_env_provider_missing() {
        let provider = EnvConfigProvider::prefixed("SIGN_PRICING_NONEXISTENT_");
        assert_eq!(provider.get_raw("pricing.endpoint").await.unwrap(), None);
    }
}
