//! JSON file provider.
//!
//! Backs both settings files and the persisted price table. Writes go to a
//! sibling temp file that is renamed over the target, so a crash mid-write
//! leaves the previous document intact. A document that does not parse
//! fails reads, and the first write replaces it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use super::{ConfigError, ConfigResult};
use super::provider::ConfigProvider;

pub struct FileConfigProvider {
    path: PathBuf,
    data: Arc<RwLock<Option<HashMap<String, Value>>>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> ConfigResult<HashMap<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_loaded(&self) -> ConfigResult<()> {
        let mut data = self.data.write().await;
        if data.is_none() {
            *data = Some(self.load().await?);
        }
        Ok(())
    }

    /// Like `ensure_loaded`, but an unparseable document is overwritten with
    /// an empty one instead of failing.
    async fn ensure_writable(&self) -> ConfigResult<()> {
        let mut data = self.data.write().await;
        if data.is_some() {
            return Ok(());
        }
        let map = match self.load().await {
            Err(ConfigError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Replacing unparseable file");
                let empty = HashMap::new();
                self.save(&empty).await?;
                empty
            }
            other => other?,
        };
        *data = Some(map);
        Ok(())
    }

    async fn save(&self, data: &HashMap<String, Value>) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let content = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Re-reads the file, discarding the in-memory copy.
    pub async fn reload(&self) -> ConfigResult<()> {
        let mut data = self.data.write().await;
        *data = Some(self.load().await?);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        "file"
    }

    /// Dotted keys descend into nested objects; string values are returned
    /// unquoted, anything else as JSON text.
    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        self.ensure_loaded().await?;

        let data = self.data.read().await;
        let Some(map) = data.as_ref() else {
            return Ok(None);
        };

        let found = map.get(key).or_else(|| {
            let mut parts = key.split('.');
            let first = map.get(parts.next()?)?;
            parts.try_fold(first, |value, part| value.get(part))
        });

        Ok(found.map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.ensure_writable().await?;

        let mut data = self.data.write().await;
        let map = data.get_or_insert_with(HashMap::new);
        let json_value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        map.insert(key.to_string(), json_value);
        self.save(map).await
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        self.ensure_writable().await?;

        let mut data = self.data.write().await;
        let Some(map) = data.as_mut() else {
            return Ok(false);
        };
        let existed = map.remove(key).is_some();
        if existed {
            self.save(map).await?;
        }
        Ok(existed)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        self.ensure_loaded().await?;

        let data = self.data.read().await;
        Ok(data
            .as_ref()
            .map(|map| {
                map.keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .finish()
    }
}
