//! Immutable view of one credential configuration section.

use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::LazyLock;

use secrecy::{ExposeSecret, SecretString};

use crate::config::{ConfigProvider, section_key};
use crate::{Error, Result};

pub const USE_MANAGED_IDENTITY: &str = "UseManagedIdentity";
pub const AUTHORITY_HOST: &str = "AuthorityHost";
pub const TENANT_ID: &str = "TenantId";
pub const CLIENT_ID: &str = "ClientId";
pub const CLIENT_SECRET: &str = "ClientSecret";
pub const CLIENT_CERTIFICATE: &str = "ClientCertificate";

// One hasher seed per process: fingerprints compare equal within a run only.
static FINGERPRINT_STATE: LazyLock<ahash::RandomState> = LazyLock::new(ahash::RandomState::new);

/// Credential options read from a configuration section.
///
/// String fields are trimmed and blank values are stored as `None`.
#[derive(Clone, Debug)]
pub struct ConfigurationSnapshot {
    name: String,
    use_managed_identity: bool,
    authority_host: Option<String>,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    client_certificate: Option<String>,
}

impl ConfigurationSnapshot {
    /// Start a snapshot for `name` with every field absent.
    pub fn builder(name: impl Into<String>) -> SnapshotBuilder {
        SnapshotBuilder {
            snapshot: Self {
                name: name.into(),
                use_managed_identity: false,
                authority_host: None,
                tenant_id: None,
                client_id: None,
                client_secret: None,
                client_certificate: None,
            },
        }
    }

    /// Whether `source` defines a section called `name`.
    pub async fn exists<P>(source: &P, name: &str) -> Result<bool>
    where
        P: ConfigProvider + ?Sized,
    {
        Ok(source.section_exists(name).await?)
    }

    /// Read the section `name` from `source`.
    pub async fn read<P>(source: &P, name: &str) -> Result<Self>
    where
        P: ConfigProvider + ?Sized,
    {
        let exists = source
            .section_exists(name)
            .await
            .map_err(|e| Error::SectionRead {
                section: name.to_string(),
                source: Box::new(e.into()),
            })?;
        if !exists {
            return Err(Error::SectionNotDefined {
                section: name.to_string(),
            });
        }

        Self::read_fields(source, name)
            .await
            .map_err(|e| Error::SectionRead {
                section: name.to_string(),
                source: Box::new(e),
            })
    }

    async fn read_fields<P>(source: &P, name: &str) -> Result<Self>
    where
        P: ConfigProvider + ?Sized,
    {
        let use_managed_identity = match read_field(source, name, USE_MANAGED_IDENTITY).await? {
            Some(value) => parse_bool(USE_MANAGED_IDENTITY, &value)?,
            None => false,
        };

        Ok(Self {
            name: name.to_string(),
            use_managed_identity,
            authority_host: read_field(source, name, AUTHORITY_HOST).await?,
            tenant_id: read_field(source, name, TENANT_ID).await?,
            client_id: read_field(source, name, CLIENT_ID).await?,
            client_secret: read_field(source, name, CLIENT_SECRET)
                .await?
                .map(SecretString::from),
            client_certificate: read_field(source, name, CLIENT_CERTIFICATE).await?,
        })
    }

    /// Write the present fields back under this snapshot's section.
    pub async fn write_to<P>(&self, source: &P) -> Result<()>
    where
        P: ConfigProvider + ?Sized,
    {
        let key = |field: &str| section_key(&self.name, field);

        source
            .set_raw(
                &key(USE_MANAGED_IDENTITY),
                if self.use_managed_identity { "true" } else { "false" },
            )
            .await?;

        let fields = [
            (AUTHORITY_HOST, self.authority_host.as_deref()),
            (TENANT_ID, self.tenant_id.as_deref()),
            (CLIENT_ID, self.client_id.as_deref()),
            (CLIENT_SECRET, self.client_secret()),
            (CLIENT_CERTIFICATE, self.client_certificate.as_deref()),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                source.set_raw(&key(field), value).await?;
            }
        }
        Ok(())
    }

    /// Digest of all seven fields, stable for the lifetime of the process.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FINGERPRINT_STATE.build_hasher();
        self.name.hash(&mut hasher);
        self.use_managed_identity.hash(&mut hasher);
        self.authority_host.hash(&mut hasher);
        self.tenant_id.hash(&mut hasher);
        self.client_id.hash(&mut hasher);
        self.client_secret().hash(&mut hasher);
        self.client_certificate.hash(&mut hasher);
        hasher.finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn use_managed_identity(&self) -> bool {
        self.use_managed_identity
    }

    pub fn authority_host(&self) -> Option<&str> {
        self.authority_host.as_deref()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_ref().map(|s| s.expose_secret())
    }

    /// Certificate thumbprint.
    pub fn client_certificate(&self) -> Option<&str> {
        self.client_certificate.as_deref()
    }
}

impl PartialEq for ConfigurationSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.use_managed_identity == other.use_managed_identity
            && self.authority_host == other.authority_host
            && self.tenant_id == other.tenant_id
            && self.client_id == other.client_id
            && self.client_secret() == other.client_secret()
            && self.client_certificate == other.client_certificate
    }
}

impl Eq for ConfigurationSnapshot {}

/// Builder for snapshots defined in code rather than read from a source.
///
/// Applies the same blank-to-absent normalization as [`ConfigurationSnapshot::read`].
#[derive(Debug)]
pub struct SnapshotBuilder {
    snapshot: ConfigurationSnapshot,
}

impl SnapshotBuilder {
    pub fn use_managed_identity(mut self, enabled: bool) -> Self {
        self.snapshot.use_managed_identity = enabled;
        self
    }

    pub fn authority_host(mut self, hint: impl Into<String>) -> Self {
        self.snapshot.authority_host = none_if_blank(Some(hint.into()));
        self
    }

    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.snapshot.tenant_id = none_if_blank(Some(tenant_id.into()));
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.snapshot.client_id = none_if_blank(Some(client_id.into()));
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.snapshot.client_secret = none_if_blank(Some(secret.into())).map(SecretString::from);
        self
    }

    pub fn client_certificate(mut self, thumbprint: impl Into<String>) -> Self {
        self.snapshot.client_certificate = none_if_blank(Some(thumbprint.into()));
        self
    }

    pub fn build(self) -> ConfigurationSnapshot {
        self.snapshot
    }
}

async fn read_field<P>(source: &P, section: &str, field: &str) -> Result<Option<String>>
where
    P: ConfigProvider + ?Sized,
{
    let raw = source.get_raw(&section_key(section, field)).await?;
    Ok(none_if_blank(raw))
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: "expected 'true' or 'false'".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;

    fn aad_source() -> MemoryConfigProvider {
        MemoryConfigProvider::from_pairs([
            ("aad.UseManagedIdentity", " False "),
            ("aad.AuthorityHost", "AzureChina"),
            ("aad.TenantId", "  tenant-1  "),
            ("aad.ClientId", "client-1"),
            ("aad.ClientSecret", "   "),
            ("aad.ClientCertificate", "ab12cd"),
        ])
    }

    #[tokio::test]
    async fn test_read_trims_and_maps_blank_to_none() {
        let snapshot = ConfigurationSnapshot::read(&aad_source(), "aad").await.unwrap();

        assert_eq!(snapshot.name(), "aad");
        assert!(!snapshot.use_managed_identity());
        assert_eq!(snapshot.authority_host(), Some("AzureChina"));
        assert_eq!(snapshot.tenant_id(), Some("tenant-1"));
        assert_eq!(snapshot.client_id(), Some("client-1"));
        assert_eq!(snapshot.client_secret(), None);
        assert_eq!(snapshot.client_certificate(), Some("ab12cd"));
    }

    #[tokio::test]
    async fn test_read_missing_section() {
        let err = ConfigurationSnapshot::read(&aad_source(), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SectionNotDefined { ref section } if section == "missing"));
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_exists() {
        let source = aad_source();
        assert!(ConfigurationSnapshot::exists(&source, "aad").await.unwrap());
        assert!(!ConfigurationSnapshot::exists(&source, "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_managed_identity_flag_parsing() {
        for (raw, expected) in [("true", true), ("TRUE", true), (" True ", true), ("false", false), ("", false)] {
            let source = MemoryConfigProvider::from_pairs([("mi.UseManagedIdentity", raw)]);
            let snapshot = ConfigurationSnapshot::read(&source, "mi").await.unwrap();
            assert_eq!(snapshot.use_managed_identity(), expected, "raw value {raw:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_flag_is_wrapped_with_section() {
        let source = MemoryConfigProvider::from_pairs([("mi.UseManagedIdentity", "yes")]);
        let err = ConfigurationSnapshot::read(&source, "mi").await.unwrap_err();

        assert!(matches!(err, Error::SectionRead { ref section, .. } if section == "mi"));
        assert!(matches!(err.root(), Error::InvalidValue { key, .. } if key == USE_MANAGED_IDENTITY));
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let original = ConfigurationSnapshot::builder("svc")
            .authority_host("https://login.example.com/")
            .tenant_id("tenant")
            .client_id("client")
            .client_secret("s3cr3t")
            .client_certificate("  ")
            .build();

        let source = MemoryConfigProvider::new();
        original.write_to(&source).await.unwrap();
        let reread = ConfigurationSnapshot::read(&source, "svc").await.unwrap();

        assert_eq!(reread, original);
        assert_eq!(reread.fingerprint(), original.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = ConfigurationSnapshot::builder("aad").client_secret("one").build();
        let b = ConfigurationSnapshot::builder("aad").client_secret("one").build();
        let c = ConfigurationSnapshot::builder("aad").client_secret("two").build();
        let d = ConfigurationSnapshot::builder("other").client_secret("one").build();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn test_fingerprint_distinguishes_fields_with_equal_values() {
        let tenant = ConfigurationSnapshot::builder("aad").tenant_id("x").build();
        let client = ConfigurationSnapshot::builder("aad").client_id("x").build();
        assert_ne!(tenant.fingerprint(), client.fingerprint());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let snapshot = ConfigurationSnapshot::builder("aad")
            .client_secret("hunter2")
            .build();
        assert!(!format!("{:?}", snapshot).contains("hunter2"));
    }
}
