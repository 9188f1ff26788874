//! Credential caching layer.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::TokenCredential;
use crate::Result;

/// Identifies one distinct configuration of one section.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: String,
    pub fingerprint: u64,
}

impl CacheKey {
    pub fn new(name: impl Into<String>, fingerprint: u64) -> Self {
        Self {
            name: name.into(),
            fingerprint,
        }
    }
}

type Slot = Arc<OnceCell<Arc<dyn TokenCredential>>>;

/// Process-wide map from [`CacheKey`] to a built credential.
///
/// Concurrent requests for the same key share one construction. Failures
/// are not cached: a failed construction leaves the slot empty and returns
/// the error to that caller only. One of the callers still waiting then
/// runs its own `build`, so waiters retry one at a time rather than all
/// failing together. Entries are never evicted.
#[derive(Debug, Default)]
pub struct CredentialCache {
    slots: DashMap<CacheKey, Slot>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the credential for `key`, running `build` if none exists yet.
    pub async fn get_or_try_insert_with<F, Fut>(
        &self,
        key: CacheKey,
        build: F,
    ) -> Result<Arc<dyn TokenCredential>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn TokenCredential>>>,
    {
        // Clone the slot out so no shard lock is held across the await.
        let existing = self.slots.get(&key).map(|slot| Arc::clone(slot.value()));
        let slot = match existing {
            Some(slot) => slot,
            None => Arc::clone(self.slots.entry(key.clone()).or_default().value()),
        };

        if let Some(credential) = slot.get() {
            tracing::debug!("Credential cache hit for [{}]", key.name);
            return Ok(Arc::clone(credential));
        }

        let credential = slot
            .get_or_try_init(|| async {
                tracing::debug!(
                    "Credential cache miss for [{}] ({:016x})",
                    key.name,
                    key.fingerprint
                );
                build().await
            })
            .await?;
        Ok(Arc::clone(credential))
    }

    /// Whether a built credential exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.initialized())
    }

    /// Number of built credentials.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
