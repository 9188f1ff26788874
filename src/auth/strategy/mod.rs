//! Credential strategy selection and dispatch.
//!
//! Precedence is fixed: managed identity, then client certificate, then
//! client secret. Exactly one strategy applies to a snapshot.

mod traits;

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::authority;
use super::certificate::CertificateLocator;
use super::snapshot::{CLIENT_ID, ConfigurationSnapshot, TENANT_ID};
use super::TokenCredential;
use crate::{Error, Result};

pub use traits::CredentialFactory;

/// The construction path chosen for a snapshot, with its validated inputs.
#[derive(Clone)]
pub enum CredentialStrategy {
    ManagedIdentity {
        client_id: Option<String>,
        authority: Url,
    },
    ClientCertificate {
        tenant_id: String,
        client_id: String,
        thumbprint: String,
        authority: Url,
    },
    ClientSecret {
        tenant_id: String,
        client_id: String,
        secret: SecretString,
        authority: Url,
    },
}

impl CredentialStrategy {
    /// Pick the strategy for `snapshot` and validate its required fields.
    pub fn select(snapshot: &ConfigurationSnapshot) -> Result<Self> {
        if snapshot.use_managed_identity() {
            return Ok(Self::ManagedIdentity {
                client_id: snapshot.client_id().map(str::to_string),
                authority: authority::resolve(snapshot.authority_host())?,
            });
        }

        if let Some(thumbprint) = snapshot.client_certificate() {
            let (tenant_id, client_id) = require_principal(snapshot)?;
            return Ok(Self::ClientCertificate {
                tenant_id,
                client_id,
                thumbprint: thumbprint.to_string(),
                authority: authority::resolve(snapshot.authority_host())?,
            });
        }

        if let Some(secret) = snapshot.client_secret() {
            let (tenant_id, client_id) = require_principal(snapshot)?;
            return Ok(Self::ClientSecret {
                tenant_id,
                client_id,
                secret: SecretString::from(secret.to_string()),
                authority: authority::resolve(snapshot.authority_host())?,
            });
        }

        Err(Error::NoStrategy {
            section: snapshot.name().to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ManagedIdentity { .. } => "managed_identity",
            Self::ClientCertificate { .. } => "client_certificate",
            Self::ClientSecret { .. } => "client_secret",
        }
    }

    pub fn authority(&self) -> &Url {
        match self {
            Self::ManagedIdentity { authority, .. }
            | Self::ClientCertificate { authority, .. }
            | Self::ClientSecret { authority, .. } => authority,
        }
    }
}

impl fmt::Debug for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManagedIdentity {
                client_id,
                authority,
            } => f
                .debug_struct("ManagedIdentity")
                .field("client_id", client_id)
                .field("authority", &authority.as_str())
                .finish(),
            Self::ClientCertificate {
                tenant_id,
                client_id,
                thumbprint,
                authority,
            } => f
                .debug_struct("ClientCertificate")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("thumbprint", thumbprint)
                .field("authority", &authority.as_str())
                .finish(),
            Self::ClientSecret {
                tenant_id,
                client_id,
                secret,
                authority,
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("has_secret", &!secret.expose_secret().is_empty())
                .field("authority", &authority.as_str())
                .finish(),
        }
    }
}

fn require_principal(snapshot: &ConfigurationSnapshot) -> Result<(String, String)> {
    let missing = |field| Error::MissingField {
        section: snapshot.name().to_string(),
        field,
    };
    let tenant_id = snapshot.tenant_id().ok_or_else(|| missing(TENANT_ID))?;
    let client_id = snapshot.client_id().ok_or_else(|| missing(CLIENT_ID))?;
    Ok((tenant_id.to_string(), client_id.to_string()))
}

/// Turns snapshots into credential objects. Performs no caching.
#[derive(Clone, Debug)]
pub struct CredentialDispatcher {
    factory: Arc<dyn CredentialFactory>,
    locator: CertificateLocator,
}

impl CredentialDispatcher {
    pub fn new(factory: Arc<dyn CredentialFactory>, locator: CertificateLocator) -> Self {
        Self { factory, locator }
    }

    /// Build the credential for `snapshot`.
    ///
    /// Every failure is wrapped with the snapshot's section name.
    pub async fn build(&self, snapshot: &ConfigurationSnapshot) -> Result<Arc<dyn TokenCredential>> {
        self.build_unwrapped(snapshot)
            .await
            .map_err(|e| Error::construction(snapshot.name(), e))
    }

    async fn build_unwrapped(
        &self,
        snapshot: &ConfigurationSnapshot,
    ) -> Result<Arc<dyn TokenCredential>> {
        let strategy = CredentialStrategy::select(snapshot)?;
        tracing::info!(
            "Building {} credential for section [{}] (authority {})",
            strategy.name(),
            snapshot.name(),
            strategy.authority()
        );

        match &strategy {
            CredentialStrategy::ManagedIdentity {
                client_id,
                authority,
            } => {
                self.factory
                    .managed_identity(client_id.as_deref(), authority)
                    .await
            }
            CredentialStrategy::ClientCertificate {
                tenant_id,
                client_id,
                thumbprint,
                authority,
            } => {
                let certificate = self.locator.find(thumbprint).await?;
                self.factory
                    .client_certificate(tenant_id, client_id, &certificate, authority)
                    .await
            }
            CredentialStrategy::ClientSecret {
                tenant_id,
                client_id,
                secret,
                authority,
            } => {
                self.factory
                    .client_secret(tenant_id, client_id, secret, authority)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::certificate::{Certificate, MemoryCertificateStore, StoreScope};
    use crate::auth::testing::RecordingFactory;

    fn dispatcher(factory: Arc<RecordingFactory>, store: MemoryCertificateStore) -> CredentialDispatcher {
        CredentialDispatcher::new(factory, CertificateLocator::new(Arc::new(store)))
    }

    #[test]
    fn test_managed_identity_wins_over_everything() {
        let snapshot = ConfigurationSnapshot::builder("mi")
            .use_managed_identity(true)
            .client_certificate("ABC")
            .client_secret("secret")
            .build();

        let strategy = CredentialStrategy::select(&snapshot).unwrap();
        assert!(matches!(
            strategy,
            CredentialStrategy::ManagedIdentity { client_id: None, .. }
        ));
        assert_eq!(strategy.authority().as_str(), "https://login.microsoftonline.com/");
    }

    #[test]
    fn test_managed_identity_ignores_missing_tenant() {
        let snapshot = ConfigurationSnapshot::builder("mi")
            .use_managed_identity(true)
            .client_id("user-assigned")
            .build();

        match CredentialStrategy::select(&snapshot).unwrap() {
            CredentialStrategy::ManagedIdentity { client_id, .. } => {
                assert_eq!(client_id.as_deref(), Some("user-assigned"));
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_certificate_wins_over_secret() {
        let snapshot = ConfigurationSnapshot::builder("svc")
            .tenant_id("t")
            .client_id("c")
            .client_certificate("ABC")
            .client_secret("secret")
            .authority_host("AzureGovernment")
            .build();

        let strategy = CredentialStrategy::select(&snapshot).unwrap();
        assert_eq!(strategy.name(), "client_certificate");
        assert_eq!(strategy.authority().as_str(), "https://login.microsoftonline.us/");
    }

    #[test]
    fn test_secret_requires_tenant_then_client() {
        let no_tenant = ConfigurationSnapshot::builder("svc")
            .client_id("c")
            .client_secret("s")
            .build();
        let err = CredentialStrategy::select(&no_tenant).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "TenantId", .. }));

        let no_client = ConfigurationSnapshot::builder("svc")
            .tenant_id("t")
            .client_secret("s")
            .build();
        let err = CredentialStrategy::select(&no_client).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "ClientId", .. }));
    }

    #[test]
    fn test_certificate_requires_principal() {
        let snapshot = ConfigurationSnapshot::builder("svc")
            .client_certificate("ABC")
            .build();
        let err = CredentialStrategy::select(&snapshot).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("TenantId"));
    }

    #[test]
    fn test_no_strategy() {
        let snapshot = ConfigurationSnapshot::builder("empty")
            .tenant_id("t")
            .client_id("c")
            .build();
        let err = CredentialStrategy::select(&snapshot).unwrap_err();
        assert!(matches!(err, Error::NoStrategy { ref section } if section == "empty"));
    }

    #[test]
    fn test_invalid_authority_in_chosen_path() {
        let snapshot = ConfigurationSnapshot::builder("mi")
            .use_managed_identity(true)
            .authority_host("moon")
            .build();
        let err = CredentialStrategy::select(&snapshot).unwrap_err();
        assert!(matches!(err, Error::InvalidAuthorityHost { .. }));
    }

    #[test]
    fn test_debug_hides_secret() {
        let snapshot = ConfigurationSnapshot::builder("svc")
            .tenant_id("t")
            .client_id("c")
            .client_secret("hunter2")
            .build();
        let strategy = CredentialStrategy::select(&snapshot).unwrap();
        assert!(!format!("{:?}", strategy).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_build_secret_calls_factory() {
        let factory = Arc::new(RecordingFactory::new());
        let dispatcher = dispatcher(factory.clone(), MemoryCertificateStore::new());
        let snapshot = ConfigurationSnapshot::builder("svc")
            .tenant_id("t")
            .client_id("c")
            .client_secret("s")
            .build();

        dispatcher.build(&snapshot).await.unwrap();
        assert_eq!(factory.calls(), vec!["client_secret:t:c"]);
    }

    #[tokio::test]
    async fn test_build_certificate_resolves_thumbprint() {
        let certificate = Certificate::from_der(b"client-cert".to_vec());
        let store = MemoryCertificateStore::new().with_certificate(StoreScope::default(), certificate.clone());
        let factory = Arc::new(RecordingFactory::new());
        let dispatcher = dispatcher(factory.clone(), store);
        let snapshot = ConfigurationSnapshot::builder("svc")
            .tenant_id("t")
            .client_id("c")
            .client_certificate(certificate.thumbprint().to_lowercase())
            .build();

        dispatcher.build(&snapshot).await.unwrap();
        assert_eq!(
            factory.calls(),
            vec![format!("client_certificate:t:c:{}", certificate.thumbprint())]
        );
    }

    #[tokio::test]
    async fn test_build_wraps_errors_with_section() {
        let factory = Arc::new(RecordingFactory::new());
        let store = MemoryCertificateStore::new().with_certificate(
            StoreScope::default(),
            Certificate::from_der(b"other".to_vec()),
        );
        let dispatcher = dispatcher(factory.clone(), store);
        let snapshot = ConfigurationSnapshot::builder("svc")
            .tenant_id("t")
            .client_id("c")
            .client_certificate("0000")
            .build();

        let err = dispatcher.build(&snapshot).await.unwrap_err();
        assert!(matches!(err, Error::Construction { ref section, .. } if section == "svc"));
        assert!(err.is_not_found());
        assert!(factory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_build_wraps_factory_failure() {
        let factory = Arc::new(RecordingFactory::failing("token endpoint rejected client"));
        let dispatcher = dispatcher(factory, MemoryCertificateStore::new());
        let snapshot = ConfigurationSnapshot::builder("mi")
            .use_managed_identity(true)
            .build();

        let err = dispatcher.build(&snapshot).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Construction);
        assert_eq!(err.section(), Some("mi"));
    }
}
