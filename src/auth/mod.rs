//! Credential resolution.
//!
//! A credential is resolved in four steps:
//! - **Snapshot**: read the named section from a [`ConfigProvider`](crate::config::ConfigProvider)
//! - **Strategy**: pick managed identity, client certificate or client secret
//! - **Certificate**: resolve a thumbprint against a [`CertificateStore`]
//! - **Cache**: build through the [`CredentialFactory`] once per distinct snapshot

pub mod authority;
#[cfg(feature = "azure")]
mod azure;
mod cache;
mod certificate;
mod credential;
mod provider;
mod snapshot;
mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use authority::{AuthorityHost, resolve as resolve_authority};
#[cfg(feature = "azure")]
pub use azure::{AzureCredentialFactory, AzureTokenCredential, ConfidentialClientCredential};
pub use cache::{CacheKey, CredentialCache};
pub use certificate::{
    Certificate, CertificateLocator, CertificateStore, DirectoryCertificateStore,
    MemoryCertificateStore, OpenCertificateStore, PrivateKey, StoreLocation, StoreScope,
};
pub use credential::{AccessToken, TokenCredential};
pub use provider::{ConfigCredentialProvider, ConfigCredentialProviderBuilder, CredentialProvider};
pub use snapshot::{
    AUTHORITY_HOST, CLIENT_CERTIFICATE, CLIENT_ID, CLIENT_SECRET, ConfigurationSnapshot,
    SnapshotBuilder, TENANT_ID, USE_MANAGED_IDENTITY,
};
pub use strategy::{CredentialDispatcher, CredentialFactory, CredentialStrategy};
