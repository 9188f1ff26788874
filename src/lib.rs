//! # confidential-credentials
//!
//! Configuration-driven cache and factory for confidential client token
//! credentials.
//!
//! A credential is requested by a logical name. The name maps to a
//! configuration section; every call re-reads that section so edits made
//! while the process runs take effect, and the resulting credential object
//! is built once per distinct set of configuration values and then served
//! from an in-process cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use confidential_credentials::auth::{ConfigCredentialProvider, CredentialFactory, CredentialProvider};
//! use confidential_credentials::config::FileConfigProvider;
//!
//! # async fn example(factory: Arc<dyn CredentialFactory>) -> confidential_credentials::Result<()> {
//! let provider = ConfigCredentialProvider::builder()
//!     .config(FileConfigProvider::auto_reload("appsettings.json".into()))
//!     .factory(factory)
//!     .build()?;
//!
//! if provider.is_defined("aad").await? {
//!     let credential = provider.get_credential("aad").await?;
//!     let token = credential.get_token(&["https://storage.azure.com/.default"]).await?;
//!     println!("token expires at {}", token.expires_on);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Each section recognizes the fields `UseManagedIdentity`, `AuthorityHost`,
//! `TenantId`, `ClientId`, `ClientSecret` and `ClientCertificate`:
//!
//! ```json
//! {
//!   "aad": {
//!     "TenantId": "00000000-0000-0000-0000-000000000000",
//!     "ClientId": "11111111-1111-1111-1111-111111111111",
//!     "ClientCertificate": "3F2A...9C"
//!   }
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod config;

pub use auth::{
    AccessToken, AuthorityHost, Certificate, CertificateStore, ConfigCredentialProvider,
    ConfigurationSnapshot, CredentialFactory, CredentialProvider, CredentialStrategy,
    DirectoryCertificateStore, MemoryCertificateStore, StoreLocation, StoreScope,
    TokenCredential,
};
#[cfg(feature = "azure")]
pub use auth::AzureCredentialFactory;
pub use config::{ConfigBuilder, ConfigError, ConfigProvider};

/// Error type for credential resolution.
///
/// Every variant carries the section name, field, thumbprint or store scope
/// needed to diagnose the failure without inspecting internals.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The named configuration section does not exist.
    #[error("Config section not defined: [{section}]")]
    SectionNotDefined { section: String },

    /// Reading the named configuration section failed.
    #[error("Error loading credential options from config section [{section}]: {source}")]
    SectionRead {
        section: String,
        #[source]
        source: Box<Error>,
    },

    /// A configuration value could not be interpreted.
    #[error("Invalid value for {key}: '{value}' ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    /// The authority host hint is neither blank, a known cloud, nor an https URL.
    #[error("Invalid AuthorityHost: '{hint}'")]
    InvalidAuthorityHost { hint: String },

    /// A field required by the selected strategy is absent.
    #[error("{field} not specified in config section [{section}]")]
    MissingField {
        section: String,
        field: &'static str,
    },

    /// None of the recognized strategies is configured.
    #[error(
        "Invalid config section [{section}]: expecting either 'UseManagedIdentity' or 'ClientCertificate' or 'ClientSecret'"
    )]
    NoStrategy { section: String },

    /// No certificate with the thumbprint exists in the store.
    #[error("X509 certificate not found: {scope}/{thumbprint}")]
    CertificateNotFound { scope: String, thumbprint: String },

    /// More than one certificate carries the thumbprint.
    #[error("Found more than one X509 certificate: {scope}/{thumbprint}")]
    AmbiguousCertificate { scope: String, thumbprint: String },

    /// The certificate store could not be opened or read.
    #[error("Certificate store {scope} unavailable: {source}")]
    CertificateStore {
        scope: String,
        #[source]
        source: std::io::Error,
    },

    /// Certificate bytes are not a valid X.509 certificate.
    #[error("Invalid X509 certificate: {message}")]
    InvalidCertificate { message: String },

    /// The certificate was found but carries no usable private key.
    #[error("X509 certificate {thumbprint} has no usable private key")]
    MissingPrivateKey { thumbprint: String },

    /// Building the credential for a section failed.
    #[error("Error creating token credential using config section [{section}]: {source}")]
    Construction {
        section: String,
        #[source]
        source: Box<Error>,
    },

    /// The credential implementation rejected the request.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The configuration source failed.
    #[error("Configuration source error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Error classification for callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing section, invalid value, missing field or no usable strategy.
    Configuration,
    /// Certificate thumbprint not found.
    NotFound,
    /// Several certificates share one thumbprint.
    AmbiguousResult,
    /// The credential object could not be instantiated.
    Construction,
    /// Token acquisition failed.
    Authentication,
    /// Source or store I/O failures.
    Internal,
}

impl Error {
    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth {
            message: message.into(),
        }
    }

    pub(crate) fn construction(section: impl Into<String>, source: Error) -> Self {
        Error::Construction {
            section: section.into(),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SectionNotDefined { .. }
            | Error::MissingPrivateKey { .. }
            | Error::InvalidValue { .. }
            | Error::InvalidAuthorityHost { .. }
            | Error::MissingField { .. }
            | Error::NoStrategy { .. } => ErrorKind::Configuration,

            Error::SectionRead { source, .. } => match source.kind() {
                ErrorKind::Internal => ErrorKind::Configuration,
                kind => kind,
            },

            Error::CertificateNotFound { .. } => ErrorKind::NotFound,
            Error::AmbiguousCertificate { .. } => ErrorKind::AmbiguousResult,

            Error::Construction { source, .. } => match source.kind() {
                kind @ (ErrorKind::Configuration
                | ErrorKind::NotFound
                | ErrorKind::AmbiguousResult) => kind,
                _ => ErrorKind::Construction,
            },

            Error::Auth { .. } => ErrorKind::Authentication,
            Error::CertificateStore { .. }
            | Error::InvalidCertificate { .. }
            | Error::Config(_) => ErrorKind::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_ambiguous(&self) -> bool {
        self.kind() == ErrorKind::AmbiguousResult
    }

    /// Section name attached by the reader or the dispatcher, if any.
    pub fn section(&self) -> Option<&str> {
        match self {
            Error::SectionNotDefined { section }
            | Error::SectionRead { section, .. }
            | Error::MissingField { section, .. }
            | Error::NoStrategy { section }
            | Error::Construction { section, .. } => Some(section),
            _ => None,
        }
    }

    /// Innermost error, skipping section-context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::SectionRead { source, .. } | Error::Construction { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
