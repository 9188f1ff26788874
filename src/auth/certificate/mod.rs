//! Certificate lookup by thumbprint.
//!
//! A [`CertificateStore`] is opened per lookup; the returned handle is
//! released when it goes out of scope, whichever way the lookup ends.

mod directory;
mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rustls_pki_types::PrivateKeyDer;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::{Error, Result};

pub use directory::DirectoryCertificateStore;
pub use memory::MemoryCertificateStore;

/// Which principal's stores to search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreLocation {
    #[default]
    CurrentUser,
    LocalMachine,
}

impl StoreLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreLocation::CurrentUser => "CurrentUser",
            StoreLocation::LocalMachine => "LocalMachine",
        }
    }
}

/// A named store at a location, e.g. `CurrentUser/My`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreScope {
    pub location: StoreLocation,
    pub name: String,
}

impl StoreScope {
    /// Personal certificate store name.
    pub const PERSONAL: &'static str = "My";

    pub fn new(location: StoreLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
        }
    }

    pub fn current_user() -> Self {
        Self::new(StoreLocation::CurrentUser, Self::PERSONAL)
    }

    pub fn local_machine() -> Self {
        Self::new(StoreLocation::LocalMachine, Self::PERSONAL)
    }
}

impl Default for StoreScope {
    fn default() -> Self {
        Self::current_user()
    }
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location.as_str(), self.name)
    }
}

/// Private key material paired with a certificate.
#[derive(Clone)]
pub struct PrivateKey(Arc<PrivateKeyDer<'static>>);

impl PrivateKey {
    pub fn new(der: PrivateKeyDer<'static>) -> Self {
        Self(Arc::new(der))
    }

    pub fn der(&self) -> &PrivateKeyDer<'static> {
        &self.0
    }

    /// Encoding of the key: `pkcs1`, `pkcs8` or `sec1`.
    pub fn format(&self) -> &'static str {
        match self.der() {
            PrivateKeyDer::Pkcs1(_) => "pkcs1",
            PrivateKeyDer::Pkcs8(_) => "pkcs8",
            PrivateKeyDer::Sec1(_) => "sec1",
            _ => "unknown",
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, [redacted])", self.format())
    }
}

/// An X.509 certificate identified by its SHA-1 thumbprint, with the
/// private key when the store holds one.
#[derive(Clone)]
pub struct Certificate {
    thumbprint: String,
    der: Arc<[u8]>,
    private_key: Option<PrivateKey>,
}

impl Certificate {
    /// Wrap DER bytes, computing the thumbprint. The bytes are not parsed.
    pub fn from_der(der: impl Into<Arc<[u8]>>) -> Self {
        let der = der.into();
        let thumbprint = hex::encode_upper(Sha1::digest(&der));
        Self {
            thumbprint,
            der,
            private_key: None,
        }
    }

    /// Wrap DER bytes after checking they hold an X.509 certificate.
    pub fn parse_der(der: impl Into<Arc<[u8]>>) -> Result<Self> {
        let der = der.into();
        x509_parser::parse_x509_certificate(&der).map_err(|e| Error::InvalidCertificate {
            message: e.to_string(),
        })?;
        Ok(Self::from_der(der))
    }

    pub fn with_private_key(mut self, key: PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Upper-case hex SHA-1 of the DER encoding.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// Case-insensitive thumbprint comparison.
    pub fn matches(&self, thumbprint: &str) -> bool {
        self.thumbprint.eq_ignore_ascii_case(thumbprint.trim())
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("thumbprint", &self.thumbprint)
            .field("der_len", &self.der.len())
            .field("private_key", &self.private_key)
            .finish()
    }
}

/// Read-only view of one opened store.
///
/// Dropping the handle closes the store.
pub trait OpenCertificateStore: Send {
    fn scope(&self) -> &StoreScope;

    fn certificates(&self) -> &[Certificate];
}

/// A source of certificate stores.
#[async_trait]
pub trait CertificateStore: Send + Sync + fmt::Debug {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Open an existing store read-only. Fails if the store does not exist.
    async fn open(&self, scope: &StoreScope) -> Result<Box<dyn OpenCertificateStore>>;
}

/// Resolves thumbprints against a certificate store, requiring exactly one match.
#[derive(Clone, Debug)]
pub struct CertificateLocator {
    store: Arc<dyn CertificateStore>,
    scope: StoreScope,
}

impl CertificateLocator {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self {
            store,
            scope: StoreScope::default(),
        }
    }

    pub fn with_scope(mut self, scope: StoreScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> &StoreScope {
        &self.scope
    }

    pub async fn find(&self, thumbprint: &str) -> Result<Certificate> {
        self.find_in(thumbprint, &self.scope).await
    }

    /// Look up `thumbprint` in `scope`.
    ///
    /// No validity-period or key-usage filtering is applied.
    pub async fn find_in(&self, thumbprint: &str, scope: &StoreScope) -> Result<Certificate> {
        let handle = self.store.open(scope).await?;
        tracing::debug!("Opened certificate store {} ({})", scope, self.store.name());

        let mut found = handle
            .certificates()
            .iter()
            .filter(|cert| cert.matches(thumbprint));

        match (found.next(), found.next()) {
            (Some(cert), None) => Ok(cert.clone()),
            (None, _) => Err(Error::CertificateNotFound {
                scope: scope.to_string(),
                thumbprint: thumbprint.to_string(),
            }),
            (Some(_), Some(_)) => Err(Error::AmbiguousCertificate {
                scope: scope.to_string(),
                thumbprint: thumbprint.to_string(),
            }),
        }
    }
}
