//! File-backed certificate store.
//!
//! Layout: `<root>/<location>/<name>/`, one certificate per `.der` or `.cer`
//! file, or any number of `CERTIFICATE` blocks per PEM file. A PEM file that
//! also holds exactly one private key pairs it with its first certificate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::BaseDirs;
use rustls_pemfile::Item;

use super::{Certificate, CertificateStore, OpenCertificateStore, PrivateKey, StoreScope};
use crate::{Error, Result};

const APP_DIR: &str = "confidential-credentials";
const CERTIFICATES_DIR: &str = "certificates";
const EXTENSIONS: &[&str] = &["pem", "crt", "cer", "der"];
const DER_EXTENSIONS: &[&str] = &["der", "cer"];

#[derive(Clone, Debug)]
pub struct DirectoryCertificateStore {
    root: PathBuf,
}

impl DirectoryCertificateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted in the platform's local data directory.
    pub fn platform_default() -> Option<Self> {
        BaseDirs::new().map(|dirs| {
            Self::new(
                dirs.data_local_dir()
                    .join(APP_DIR)
                    .join(CERTIFICATES_DIR),
            )
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scope_dir(&self, scope: &StoreScope) -> PathBuf {
        self.root.join(scope.location.as_str()).join(&scope.name)
    }

    async fn load(&self, scope: &StoreScope) -> std::io::Result<Vec<Certificate>> {
        let dir = self.scope_dir(scope);
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut certificates = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !has_extension(&path, EXTENSIONS) || !entry.file_type().await?.is_file() {
                continue;
            }

            let bytes = tokio::fs::read(&path).await?;
            match parse_certificates(&path, &bytes) {
                Ok(parsed) => certificates.extend(parsed),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(certificates)
    }
}

/// Decode the certificates in one file.
///
/// PEM files may hold a chain and keys; a single key is paired with the
/// first certificate. Files without PEM blocks are read as one DER
/// certificate only when their extension says so.
fn parse_certificates(path: &Path, bytes: &[u8]) -> std::result::Result<Vec<Certificate>, String> {
    let items = rustls_pemfile::read_all(&mut &bytes[..])
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid PEM: {}", e))?;

    if items.is_empty() {
        if !has_extension(path, DER_EXTENSIONS) {
            return Ok(Vec::new());
        }
        return Certificate::parse_der(bytes.to_vec())
            .map(|certificate| vec![certificate])
            .map_err(|e| e.to_string());
    }

    let mut certificates = Vec::new();
    let mut keys = Vec::new();
    for item in items {
        match item {
            Item::X509Certificate(der) => {
                certificates.push(Certificate::parse_der(der.to_vec()).map_err(|e| e.to_string())?)
            }
            Item::Pkcs1Key(key) => keys.push(PrivateKey::new(key.into())),
            Item::Pkcs8Key(key) => keys.push(PrivateKey::new(key.into())),
            Item::Sec1Key(key) => keys.push(PrivateKey::new(key.into())),
            _ => {}
        }
    }

    match (certificates.first_mut(), keys.len()) {
        (Some(leaf), 1) => leaf.private_key = keys.pop(),
        (None, n) if n > 0 => {
            tracing::debug!("{} holds keys but no certificate", path.display())
        }
        (Some(_), n) if n > 1 => {
            tracing::warn!("{} holds {} keys; none paired", path.display(), n)
        }
        _ => {}
    }
    Ok(certificates)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

struct DirectoryStoreHandle {
    scope: StoreScope,
    certificates: Vec<Certificate>,
}

impl OpenCertificateStore for DirectoryStoreHandle {
    fn scope(&self) -> &StoreScope {
        &self.scope
    }

    fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }
}

impl Drop for DirectoryStoreHandle {
    fn drop(&mut self) {
        tracing::debug!("Closed certificate store {}", self.scope);
    }
}

#[async_trait]
impl CertificateStore for DirectoryCertificateStore {
    fn name(&self) -> &str {
        "directory"
    }

    async fn open(&self, scope: &StoreScope) -> Result<Box<dyn OpenCertificateStore>> {
        let certificates = self
            .load(scope)
            .await
            .map_err(|source| Error::CertificateStore {
                scope: scope.to_string(),
                source,
            })?;

        Ok(Box::new(DirectoryStoreHandle {
            scope: scope.clone(),
            certificates,
        }))
    }
}
