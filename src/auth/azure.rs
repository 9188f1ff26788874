//! Azure credential factory.
//!
//! Managed identities and public-cloud client secrets go through
//! `azure_identity`. Certificate credentials, and secrets for any other
//! authority, use the client-credentials grant against
//! `<authority><tenant>/oauth2/v2.0/token` directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use azure_identity::UserAssignedId;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rustls_pki_types::PrivateKeyDer;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tokio::sync::RwLock;
use url::Url;

use super::{AccessToken, AuthorityHost, Certificate, CredentialFactory, TokenCredential};
use crate::{Error, Result};

const JWT_BEARER: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 600;

/// [`CredentialFactory`] producing Microsoft Entra ID credentials.
#[derive(Clone, Debug, Default)]
pub struct AzureCredentialFactory {
    http: reqwest::Client,
}

impl AzureCredentialFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `http` for token requests made by this crate.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CredentialFactory for AzureCredentialFactory {
    async fn managed_identity(
        &self,
        client_id: Option<&str>,
        authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>> {
        tracing::debug!("Managed identity does not use authority {}", authority);

        let options = client_id.map(|id| azure_identity::ManagedIdentityCredentialOptions {
            user_assigned_id: Some(UserAssignedId::ClientId(id.to_string())),
            client_options: Default::default(),
        });
        let credential = azure_identity::ManagedIdentityCredential::new(options).map_err(sdk_error)?;
        Ok(Arc::new(AzureTokenCredential::new(credential)))
    }

    async fn client_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: &Certificate,
        authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>> {
        let signer = AssertionSigner::new(certificate)?;
        Ok(Arc::new(ConfidentialClientCredential::new(
            self.http.clone(),
            token_endpoint(authority, tenant_id)?,
            client_id,
            ClientAuth::Certificate(signer),
        )))
    }

    async fn client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        secret: &SecretString,
        authority: &Url,
    ) -> Result<Arc<dyn TokenCredential>> {
        if authority.as_str() == AuthorityHost::AzurePublicCloud.endpoint() {
            let credential = azure_identity::ClientSecretCredential::new(
                tenant_id,
                client_id.to_string(),
                azure_core::credentials::Secret::new(secret.expose_secret().to_string()),
                None,
            )
            .map_err(sdk_error)?;
            return Ok(Arc::new(AzureTokenCredential::new(credential)));
        }

        Ok(Arc::new(ConfidentialClientCredential::new(
            self.http.clone(),
            token_endpoint(authority, tenant_id)?,
            client_id,
            ClientAuth::Secret(secret.clone()),
        )))
    }
}

fn sdk_error(e: azure_core::Error) -> Error {
    Error::auth(format!("Azure credential error: {}", e))
}

/// Token endpoint for `tenant_id` under `authority`.
pub(crate) fn token_endpoint(authority: &Url, tenant_id: &str) -> Result<Url> {
    let mut base = authority.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(&format!("{}/oauth2/v2.0/token", tenant_id))
        .map_err(|e| Error::InvalidValue {
            key: "TenantId".into(),
            value: tenant_id.into(),
            message: e.to_string(),
        })
}

/// Adapts an `azure_core` credential to [`TokenCredential`].
#[derive(Clone)]
pub struct AzureTokenCredential {
    inner: Arc<dyn azure_core::credentials::TokenCredential>,
}

impl AzureTokenCredential {
    pub fn new(inner: Arc<dyn azure_core::credentials::TokenCredential>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for AzureTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureTokenCredential").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for AzureTokenCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let token = self
            .inner
            .get_token(scopes, None)
            .await
            .map_err(|e| Error::auth(format!("Failed to get Azure token: {}", e)))?;

        let expires_on = DateTime::from_timestamp(token.expires_on.unix_timestamp(), 0)
            .ok_or_else(|| Error::auth("Azure token expiry out of range"))?;
        Ok(AccessToken::new(token.token.secret(), expires_on))
    }
}

enum ClientAuth {
    Secret(SecretString),
    Certificate(AssertionSigner),
}

/// Signs client assertions with a certificate's RSA key.
struct AssertionSigner {
    key: EncodingKey,
    x5t: String,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    iat: i64,
    exp: i64,
}

impl AssertionSigner {
    fn new(certificate: &Certificate) -> Result<Self> {
        let unusable = || Error::MissingPrivateKey {
            thumbprint: certificate.thumbprint().to_string(),
        };
        let private_key = certificate.private_key().ok_or_else(unusable)?;
        let tag = match private_key.der() {
            PrivateKeyDer::Pkcs1(_) => "RSA PRIVATE KEY",
            PrivateKeyDer::Pkcs8(_) => "PRIVATE KEY",
            _ => return Err(unusable()),
        };

        let encoded = pem::encode(&pem::Pem::new(tag, private_key.der().secret_der().to_vec()));
        let key = EncodingKey::from_rsa_pem(encoded.as_bytes()).map_err(|e| {
            tracing::debug!(
                "Rejected {} key for {}: {}",
                private_key.format(),
                certificate.thumbprint(),
                e
            );
            unusable()
        })?;

        Ok(Self {
            key,
            x5t: URL_SAFE_NO_PAD.encode(Sha1::digest(certificate.der())),
        })
    }

    fn sign(&self, audience: &Url, client_id: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            aud: audience.as_str(),
            iss: client_id,
            sub: client_id,
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.x5t = Some(self.x5t.clone());
        jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|e| Error::auth(format!("Failed to sign client assertion: {}", e)))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Client-credentials grant against an Entra ID token endpoint.
///
/// Tokens are kept per scope set until they near expiry.
pub struct ConfidentialClientCredential {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    auth: ClientAuth,
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl ConfidentialClientCredential {
    fn new(http: reqwest::Client, token_url: Url, client_id: &str, auth: ClientAuth) -> Self {
        Self {
            http,
            token_url,
            client_id: client_id.to_string(),
            auth,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let body = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("grant_type", "client_credentials")
                .append_pair("client_id", &self.client_id)
                .append_pair("scope", scope);
            match &self.auth {
                ClientAuth::Secret(secret) => {
                    form.append_pair("client_secret", secret.expose_secret());
                }
                ClientAuth::Certificate(signer) => {
                    let assertion = signer.sign(&self.token_url, &self.client_id)?;
                    form.append_pair("client_assertion_type", JWT_BEARER)
                        .append_pair("client_assertion", &assertion);
                }
            }
            form.finish()
        };

        let response = self
            .http
            .post(self.token_url.clone())
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| Error::auth(format!("Failed to request token: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token request failed with status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Invalid token response: {}", e)))?;
        Ok(AccessToken::new(
            token.access_token,
            Utc::now() + Duration::seconds(token.expires_in),
        ))
    }
}

impl fmt::Debug for ConfidentialClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = match self.auth {
            ClientAuth::Secret(_) => "secret",
            ClientAuth::Certificate(_) => "certificate",
        };
        f.debug_struct("ConfidentialClientCredential")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("auth", &auth)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for ConfidentialClientCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let scope = scopes.join(" ");
        if let Some(token) = self.tokens.read().await.get(&scope)
            && !token.needs_refresh()
        {
            return Ok(token.clone());
        }

        let token = self.request_token(&scope).await?;
        tracing::debug!("Acquired token for client {} ({})", self.client_id, scope);
        self.tokens.write().await.insert(scope, token.clone());
        Ok(token)
    }
}
