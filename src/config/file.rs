//! File-based Configuration Provider
//!
//! Loads configuration from JSON files. Nested objects are addressed with
//! dotted keys, so `{"aad": {"TenantId": "t"}}` answers `aad.TenantId`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::provider::ConfigProvider;
use super::{ConfigResult, KEY_SEPARATOR};

/// File-based configuration provider
pub struct FileConfigProvider {
    /// Path to the configuration file
    path: PathBuf,
    /// Cached data
    data: Arc<RwLock<Option<HashMap<String, Value>>>>,
    /// Whether to re-read the file on every access
    auto_reload: bool,
}

impl FileConfigProvider {
    /// Create a new file provider that reads the file once
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: Arc::new(RwLock::new(None)),
            auto_reload: false,
        }
    }

    /// Create a file provider that picks up external edits on every access
    pub fn auto_reload(path: PathBuf) -> Self {
        Self {
            path,
            data: Arc::new(RwLock::new(None)),
            auto_reload: true,
        }
    }

    /// Load configuration from file
    async fn load(&self) -> ConfigResult<HashMap<String, Value>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(HashMap::new());
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let data: HashMap<String, Value> = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Ensure data is loaded
    async fn ensure_loaded(&self) -> ConfigResult<()> {
        let mut data = self.data.write().await;
        if data.is_none() || self.auto_reload {
            *data = Some(self.load().await?);
        }
        Ok(())
    }

    /// Save configuration to file
    async fn save(&self, data: &HashMap<String, Value>) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Reload configuration from file
    pub async fn reload(&self) -> ConfigResult<()> {
        let mut data = self.data.write().await;
        *data = Some(self.load().await?);
        Ok(())
    }

    /// Get the file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

fn lookup<'a>(map: &'a HashMap<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split(KEY_SEPARATOR);
    let first = map.get(parts.next()?)?;
    parts.try_fold(first, |current, part| current.get(part))
}

fn insert_path(map: &mut HashMap<String, Value>, key: &str, value: Value) {
    let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    let Some((last, parents)) = parts.split_last() else {
        return;
    };
    let Some((first, rest)) = parents.split_first() else {
        map.insert(last.to_string(), value);
        return;
    };

    let mut current = map
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Default::default()));
    for part in rest {
        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        let Value::Object(obj) = current else {
            return;
        };
        current = obj
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    if !current.is_object() {
        *current = Value::Object(Default::default());
    }
    if let Value::Object(obj) = current {
        obj.insert(last.to_string(), value);
    }
}

fn remove_path(map: &mut HashMap<String, Value>, key: &str) -> bool {
    let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    let Some((last, parents)) = parts.split_last() else {
        return false;
    };
    let Some((first, rest)) = parents.split_first() else {
        return map.remove(*last).is_some();
    };

    let mut current = match map.get_mut(*first) {
        Some(v) => v,
        None => return false,
    };
    for part in rest {
        current = match current.get_mut(*part) {
            Some(v) => v,
            None => return false,
        };
    }
    match current {
        Value::Object(obj) => obj.remove(*last).is_some(),
        _ => false,
    }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            for (k, v) in obj {
                flatten_into(&format!("{prefix}{KEY_SEPARATOR}{k}"), v, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

#[async_trait::async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        self.ensure_loaded().await?;

        let data = self.data.read().await;
        let Some(ref map) = *data else {
            return Ok(None);
        };

        match lookup(map, key) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(v) => Ok(Some(v.to_string())),
        }
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.ensure_loaded().await?;

        let mut data = self.data.write().await;
        let map = data.get_or_insert_with(HashMap::new);

        // Parse value as JSON if possible, otherwise store as string
        let json_value: Value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

        insert_path(map, key, json_value);

        self.save(map).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        self.ensure_loaded().await?;

        let mut data = self.data.write().await;
        if let Some(ref mut map) = *data {
            let existed = remove_path(map, key);
            if existed {
                self.save(map).await?;
            }
            Ok(existed)
        } else {
            Ok(false)
        }
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        self.ensure_loaded().await?;

        let data = self.data.read().await;
        let Some(ref map) = *data else {
            return Ok(Vec::new());
        };

        let mut keys = Vec::new();
        for (k, v) in map {
            flatten_into(k, v, &mut keys);
        }
        keys.retain(|k| k.starts_with(prefix));
        Ok(keys)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("auto_reload", &self.auto_reload)
            .finish()
    }
}
