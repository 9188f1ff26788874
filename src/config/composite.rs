//! Composite configuration source.
//!
//! Reads take the first source holding a key, so earlier sources override
//! later ones. A section exists if any source defines a key beneath it.
//! Writes go to the first writable source; read-only sources such as the
//! environment are skipped.

use std::collections::BTreeSet;

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

/// Priority-ordered chain of configuration sources.
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a source below every source added so far.
    pub fn add_provider(&mut self, provider: Box<dyn ConfigProvider>) {
        self.providers.push(provider);
    }

    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn writable(&self) -> impl Iterator<Item = &dyn ConfigProvider> {
        self.providers
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.is_read_only())
    }
}

impl Default for CompositeConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for CompositeConfigProvider {
    fn name(&self) -> &str {
        "composite"
    }

    fn is_read_only(&self) -> bool {
        self.writable().next().is_none()
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        for provider in &self.providers {
            if let Some(value) = provider.get_raw(key).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        match self.writable().next() {
            Some(provider) => provider.set_raw(key, value).await,
            None => Err(ConfigError::Provider {
                message: format!("No writable source among {:?}", self.provider_names()),
            }),
        }
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        let mut deleted = false;
        for provider in self.writable() {
            deleted |= provider.delete(key).await?;
        }
        Ok(deleted)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut keys = BTreeSet::new();
        for provider in &self.providers {
            keys.extend(provider.list_keys(prefix).await?);
        }
        Ok(keys.into_iter().collect())
    }
}

impl std::fmt::Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeConfigProvider")
            .field("provider_count", &self.providers.len())
            .field("provider_names", &self.provider_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ConfigurationSnapshot;
    use crate::config::{ConfigBuilder, EnvConfigProvider, MemoryConfigProvider};

    #[tokio::test]
    async fn test_composite_provider_priority() {
        let high_priority = MemoryConfigProvider::named("high");
        high_priority.set_raw("aad.ClientId", "high").await.unwrap();

        let low_priority = MemoryConfigProvider::named("low");
        low_priority.set_raw("aad.ClientId", "low").await.unwrap();
        low_priority.set_raw("aad.TenantId", "from_low").await.unwrap();

        let composite = CompositeConfigProvider::new()
            .provider(Box::new(high_priority))
            .provider(Box::new(low_priority));

        assert_eq!(
            composite.get_raw("aad.ClientId").await.unwrap(),
            Some("high".to_string())
        );
        assert_eq!(
            composite.get_raw("aad.TenantId").await.unwrap(),
            Some("from_low".to_string())
        );
    }

    #[tokio::test]
    async fn test_composite_provider_section_spans_providers() {
        let p1 = MemoryConfigProvider::from_pairs([("aad.ClientId", "c"), ("aad.TenantId", "t")]);
        let p2 = MemoryConfigProvider::from_pairs([("aad.ClientId", "c2"), ("mi.UseManagedIdentity", "true")]);

        let composite = CompositeConfigProvider::new()
            .provider(Box::new(p1))
            .provider(Box::new(p2));

        let keys = composite.list_keys("aad.").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(composite.section_exists("mi").await.unwrap());
        assert!(!composite.section_exists("none").await.unwrap());
    }

    #[tokio::test]
    async fn test_composite_provider_set() {
        let composite = CompositeConfigProvider::new()
            .provider(Box::new(MemoryConfigProvider::new()))
            .provider(Box::new(MemoryConfigProvider::new()));

        composite.set_raw("new_key", "new_value").await.unwrap();

        assert_eq!(
            composite.get_raw("new_key").await.unwrap(),
            Some("new_value".to_string())
        );
    }

    #[tokio::test]
    async fn test_composite_provider_delete() {
        let p1 = MemoryConfigProvider::from_pairs([("shared", "from_p1")]);
        let p2 = MemoryConfigProvider::from_pairs([("shared", "from_p2")]);

        let composite = CompositeConfigProvider::new()
            .provider(Box::new(p1))
            .provider(Box::new(p2));

        assert!(composite.delete("shared").await.unwrap());
        assert_eq!(composite.get_raw("shared").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_composite_writes_skip_read_only_sources() {
        let writable = MemoryConfigProvider::named("defaults");
        let composite = CompositeConfigProvider::new()
            .provider(Box::new(EnvConfigProvider::prefixed("TEST_CCRED_COMPOSITE_")))
            .provider(Box::new(writable.clone()));
        assert!(!composite.is_read_only());

        composite.set_raw("aad.ClientId", "c").await.unwrap();
        assert_eq!(writable.get_raw("aad.ClientId").await.unwrap(), Some("c".to_string()));

        assert!(composite.delete("aad.ClientId").await.unwrap());
        assert!(!composite.delete("aad.ClientId").await.unwrap());
        assert_eq!(writable.get_raw("aad.ClientId").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_composite_without_writable_source() {
        let composite =
            CompositeConfigProvider::new().provider(Box::new(EnvConfigProvider::new()));
        assert!(composite.is_read_only());

        let err = composite.set_raw("aad.ClientId", "c").await.unwrap_err();
        assert!(err.to_string().contains("No writable source"));
        assert!(!composite.delete("aad.ClientId").await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_written_through_env_first_chain() {
        let file_dir = tempfile::TempDir::new().unwrap();
        let composite = ConfigBuilder::new()
            .env_with_prefix("TEST_CCRED_COMPOSITE_WRITE_")
            .file(file_dir.path().join("settings.json"))
            .build()
            .await
            .unwrap();

        let snapshot = ConfigurationSnapshot::builder("aad")
            .tenant_id("t")
            .client_id("c")
            .client_secret("s")
            .build();
        snapshot.write_to(&composite).await.unwrap();

        let reread = ConfigurationSnapshot::read(&composite, "aad").await.unwrap();
        assert_eq!(reread, snapshot);
    }

    #[tokio::test]
    async fn test_composite_provider_names() {
        let composite = CompositeConfigProvider::new()
            .provider(Box::new(MemoryConfigProvider::named("first")))
            .provider(Box::new(MemoryConfigProvider::named("second")));

        assert_eq!(composite.provider_names(), vec!["first", "second"]);
    }
}
