//! Authority host resolution.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

const SECURE_SCHEME_PREFIX: &str = "https://";

/// Well-known clouds, addressable by name in `AuthorityHost`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityHost {
    AzurePublicCloud,
    AzureChina,
    AzureGermany,
    AzureGovernment,
}

impl AuthorityHost {
    pub const ALL: [AuthorityHost; 4] = [
        AuthorityHost::AzurePublicCloud,
        AuthorityHost::AzureChina,
        AuthorityHost::AzureGermany,
        AuthorityHost::AzureGovernment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AuthorityHost::AzurePublicCloud => "AzurePublicCloud",
            AuthorityHost::AzureChina => "AzureChina",
            AuthorityHost::AzureGermany => "AzureGermany",
            AuthorityHost::AzureGovernment => "AzureGovernment",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            AuthorityHost::AzurePublicCloud => "https://login.microsoftonline.com/",
            AuthorityHost::AzureChina => "https://login.chinacloudapi.cn/",
            AuthorityHost::AzureGermany => "https://login.microsoftonline.de/",
            AuthorityHost::AzureGovernment => "https://login.microsoftonline.us/",
        }
    }

    /// Case-insensitive lookup by cloud name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|host| host.name().eq_ignore_ascii_case(name))
    }
}

/// Map an `AuthorityHost` hint to its endpoint.
///
/// Blank selects the public cloud, a cloud name selects that cloud, and an
/// `https://` value is taken literally.
pub fn resolve(hint: Option<&str>) -> Result<Url> {
    let trimmed = hint.map(str::trim).unwrap_or_default();
    let invalid = || Error::InvalidAuthorityHost {
        hint: hint.unwrap_or_default().to_string(),
    };

    let endpoint = if trimmed.is_empty() {
        AuthorityHost::AzurePublicCloud.endpoint()
    } else if let Some(host) = AuthorityHost::from_name(trimmed) {
        host.endpoint()
    } else if has_secure_scheme(trimmed) {
        trimmed
    } else {
        return Err(invalid());
    };

    Url::parse(endpoint).map_err(|_| invalid())
}

fn has_secure_scheme(hint: &str) -> bool {
    hint.get(..SECURE_SCHEME_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SECURE_SCHEME_PREFIX))
}
