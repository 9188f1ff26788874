//! In-process certificate store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Certificate, CertificateStore, OpenCertificateStore, StoreScope};
use crate::{Error, Result};

/// Certificate store held in memory, keyed by scope.
///
/// Only scopes that received at least one certificate exist.
#[derive(Debug, Default)]
pub struct MemoryCertificateStore {
    stores: RwLock<HashMap<StoreScope, Vec<Certificate>>>,
    open_handles: Arc<AtomicUsize>,
    opened_total: AtomicUsize,
}

impl MemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate during construction.
    pub fn with_certificate(mut self, scope: StoreScope, certificate: Certificate) -> Self {
        self.stores
            .get_mut()
            .entry(scope)
            .or_default()
            .push(certificate);
        self
    }

    pub async fn add(&self, scope: StoreScope, certificate: Certificate) {
        self.stores
            .write()
            .await
            .entry(scope)
            .or_default()
            .push(certificate);
    }

    /// Remove every certificate with `thumbprint` from `scope`.
    pub async fn remove(&self, scope: &StoreScope, thumbprint: &str) -> usize {
        let mut stores = self.stores.write().await;
        let Some(certs) = stores.get_mut(scope) else {
            return 0;
        };
        let before = certs.len();
        certs.retain(|c| !c.matches(thumbprint));
        before - certs.len()
    }

    /// Handles currently open.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Handles opened over the store's lifetime.
    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }
}

struct MemoryStoreHandle {
    scope: StoreScope,
    certificates: Vec<Certificate>,
    open_handles: Arc<AtomicUsize>,
}

impl OpenCertificateStore for MemoryStoreHandle {
    fn scope(&self) -> &StoreScope {
        &self.scope
    }

    fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }
}

impl Drop for MemoryStoreHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("Closed certificate store {}", self.scope);
    }
}

#[async_trait]
impl CertificateStore for MemoryCertificateStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open(&self, scope: &StoreScope) -> Result<Box<dyn OpenCertificateStore>> {
        let stores = self.stores.read().await;
        let Some(certificates) = stores.get(scope) else {
            return Err(Error::CertificateStore {
                scope: scope.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "store does not exist"),
            });
        };

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStoreHandle {
            scope: scope.clone(),
            certificates: certificates.clone(),
            open_handles: Arc::clone(&self.open_handles),
        }))
    }
}
