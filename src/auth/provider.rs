//! Credential provider trait and its configuration-backed implementation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::cache::{CacheKey, CredentialCache};
use super::certificate::{
    CertificateLocator, CertificateStore, DirectoryCertificateStore, MemoryCertificateStore,
    StoreScope,
};
use super::snapshot::ConfigurationSnapshot;
use super::strategy::{CredentialDispatcher, CredentialFactory};
use super::TokenCredential;
use crate::config::{ConfigError, ConfigProvider};
use crate::{Error, Result};

/// Resolves credentials by logical name.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Provider name for debugging.
    fn name(&self) -> &str;

    /// Whether a configuration section called `name` exists.
    async fn is_defined(&self, name: &str) -> Result<bool>;

    /// Credential for the current contents of section `name`.
    async fn get_credential(&self, name: &str) -> Result<Arc<dyn TokenCredential>>;
}

/// Provider that reads each section from a [`ConfigProvider`] on every call
/// and caches one credential per distinct section contents.
///
/// Clones share the cache.
#[derive(Clone)]
pub struct ConfigCredentialProvider {
    config: Arc<dyn ConfigProvider>,
    dispatcher: CredentialDispatcher,
    cache: Arc<CredentialCache>,
}

impl ConfigCredentialProvider {
    pub fn builder() -> ConfigCredentialProviderBuilder {
        ConfigCredentialProviderBuilder::default()
    }

    pub fn new(config: Arc<dyn ConfigProvider>, factory: Arc<dyn CredentialFactory>) -> Self {
        Self::with_locator(config, factory, default_locator())
    }

    fn with_locator(
        config: Arc<dyn ConfigProvider>,
        factory: Arc<dyn CredentialFactory>,
        locator: CertificateLocator,
    ) -> Self {
        Self {
            config,
            dispatcher: CredentialDispatcher::new(factory, locator),
            cache: Arc::new(CredentialCache::new()),
        }
    }

    /// Number of distinct credentials built so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl fmt::Debug for ConfigCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigCredentialProvider")
            .field("config", &self.config.name())
            .field("dispatcher", &self.dispatcher)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for ConfigCredentialProvider {
    fn name(&self) -> &str {
        "config"
    }

    async fn is_defined(&self, name: &str) -> Result<bool> {
        ConfigurationSnapshot::exists(self.config.as_ref(), name).await
    }

    async fn get_credential(&self, name: &str) -> Result<Arc<dyn TokenCredential>> {
        let snapshot = ConfigurationSnapshot::read(self.config.as_ref(), name).await?;
        let key = CacheKey::new(name, snapshot.fingerprint());

        self.cache
            .get_or_try_insert_with(key, || async {
                self.dispatcher.build(&snapshot).await.inspect_err(|e| {
                    tracing::warn!("Credential construction failed: {}", e);
                })
            })
            .await
    }
}

fn default_locator() -> CertificateLocator {
    let store: Arc<dyn CertificateStore> = match DirectoryCertificateStore::platform_default() {
        Some(store) => Arc::new(store),
        None => {
            tracing::debug!("No local data directory; certificate lookups will find nothing");
            Arc::new(MemoryCertificateStore::new())
        }
    };
    CertificateLocator::new(store)
}

/// Builder for [`ConfigCredentialProvider`].
#[derive(Default)]
pub struct ConfigCredentialProviderBuilder {
    config: Option<Arc<dyn ConfigProvider>>,
    factory: Option<Arc<dyn CredentialFactory>>,
    certificate_store: Option<Arc<dyn CertificateStore>>,
    store_scope: Option<StoreScope>,
}

impl ConfigCredentialProviderBuilder {
    /// Configuration source. Required.
    pub fn config(mut self, config: impl ConfigProvider + 'static) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Shared configuration source, e.g. one the caller keeps editing.
    pub fn shared_config(mut self, config: Arc<dyn ConfigProvider>) -> Self {
        self.config = Some(config);
        self
    }

    /// Credential factory. Required.
    pub fn factory(mut self, factory: Arc<dyn CredentialFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Certificate store; defaults to the platform directory store.
    pub fn certificate_store(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.certificate_store = Some(store);
        self
    }

    /// Store searched for thumbprints; defaults to `CurrentUser/My`.
    pub fn store_scope(mut self, scope: StoreScope) -> Self {
        self.store_scope = Some(scope);
        self
    }

    pub fn build(self) -> Result<ConfigCredentialProvider> {
        let config = self.config.ok_or_else(|| missing("configuration source"))?;
        let factory = self.factory.ok_or_else(|| missing("credential factory"))?;

        let locator = match self.certificate_store {
            Some(store) => CertificateLocator::new(store),
            None => default_locator(),
        };
        let locator = locator.with_scope(self.store_scope.unwrap_or_default());

        Ok(ConfigCredentialProvider::with_locator(config, factory, locator))
    }
}

fn missing(what: &str) -> Error {
    Error::Config(ConfigError::Provider {
        message: format!("{} not set on ConfigCredentialProvider builder", what),
    })
}
