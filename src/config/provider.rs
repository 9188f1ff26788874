//! Configuration Provider Trait

use super::{ConfigResult, KEY_SEPARATOR};

/// Core configuration provider trait
///
/// Implementations must answer each call from current state; callers rely
/// on repeated queries observing external changes.
#[async_trait::async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Whether `set_raw` and `delete` always fail.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Get a raw configuration value
    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>>;

    /// Set a raw configuration value
    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()>;

    /// Delete a configuration value
    async fn delete(&self, key: &str) -> ConfigResult<bool>;

    /// List keys matching a prefix
    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>>;

    /// Whether any key lives beneath `section`.
    ///
    /// A section whose fields are all blank still exists; a section with no
    /// keys at all does not.
    async fn section_exists(&self, section: &str) -> ConfigResult<bool> {
        let prefix = format!("{section}{KEY_SEPARATOR}");
        Ok(!self.list_keys(&prefix).await?.is_empty())
    }
}

#[async_trait::async_trait]
impl<P: ConfigProvider + ?Sized> ConfigProvider for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_read_only(&self) -> bool {
        (**self).is_read_only()
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        (**self).get_raw(key).await
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        (**self).set_raw(key, value).await
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        (**self).delete(key).await
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        (**self).list_keys(prefix).await
    }

    async fn section_exists(&self, section: &str) -> ConfigResult<bool> {
        (**self).section_exists(section).await
    }
}
