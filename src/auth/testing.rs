//! Test doubles shared by unit tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::SecretString;
use url::Url;

use super::{AccessToken, Certificate, CredentialFactory, TokenCredential};
use crate::{Error, Result};

#[derive(Debug)]
pub struct FakeCredential {
    pub label: String,
}

impl FakeCredential {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for FakeCredential {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
        Ok(AccessToken::new(
            format!("token-{}", self.label),
            Utc::now() + Duration::hours(1),
        ))
    }
}

/// Records every factory call; optionally fails all of them.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    calls: Mutex<Vec<String>>,
    builds: AtomicUsize,
    failure: Option<String>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) -> Result<Arc<dyn TokenCredential>> {
        if let Some(message) = &self.failure {
            return Err(Error::auth(message.clone()));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call.clone());
        Ok(Arc::new(FakeCredential::new(call)))
    }
}

#[async_trait]
impl CredentialFactory for RecordingFactory {
    async fn managed_identity(
        &self,
        client_id: Option<&str>,
        _authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>> {
        self.record(format!("managed_identity:{}", client_id.unwrap_or("system")))
    }

    async fn client_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: &Certificate,
        _authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>> {
        self.record(format!(
            "client_certificate:{}:{}:{}",
            tenant_id,
            client_id,
            certificate.thumbprint()
        ))
    }

    async fn client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        _secret: &SecretString,
        _authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>> {
        self.record(format!("client_secret:{}:{}", tenant_id, client_id))
    }
}
