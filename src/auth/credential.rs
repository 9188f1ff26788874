//! Credential handle and access token types.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::Result;

/// A bearer token issued for a set of scopes.
#[derive(Clone, Debug, Deserialize)]
pub struct AccessToken {
    /// Token value.
    #[serde(deserialize_with = "deserialize_secret")]
    pub token: SecretString,
    /// Instant after which the token is no longer valid.
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_on,
        }
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_on
    }

    /// Check if token needs refresh (within 5 minutes of expiry).
    pub fn needs_refresh(&self) -> bool {
        Utc::now() >= self.expires_on - Duration::minutes(5)
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// An object able to produce access tokens for requested scopes.
///
/// Instances are built by a [`CredentialFactory`](super::CredentialFactory)
/// and shared through the credential cache; how tokens are obtained,
/// refreshed and cached is entirely up to the implementation.
#[async_trait]
pub trait TokenCredential: Send + Sync + Debug {
    /// Acquire a token for `scopes`.
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;
}
