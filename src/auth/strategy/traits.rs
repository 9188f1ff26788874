//! Credential construction trait.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use url::Url;

use crate::Result;
use crate::auth::{Certificate, TokenCredential};

/// Builds concrete credential objects for each strategy.
///
/// Supplied by the host; this is where the token-issuing implementation
/// plugs in. Each call may be expensive, and the provider calls it at most
/// once per distinct configuration.
#[async_trait]
pub trait CredentialFactory: Send + Sync + Debug {
    /// Platform-managed identity. `client_id` selects a user-assigned
    /// identity; `None` means the system-assigned one.
    async fn managed_identity(
        &self,
        client_id: Option<&str>,
        authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>>;

    /// Service principal authenticating with a certificate.
    async fn client_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: &Certificate,
        authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>>;

    /// Service principal authenticating with a client secret.
    async fn client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        secret: &SecretString,
        authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>>;
}
