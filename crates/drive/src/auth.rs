//! Service-account authentication.
//!
//! The bot authenticates as a Google service account with read-only scope.
//! The key is a JSON document, taken either from an environment variable
//! (convenient on hosted platforms) or from a local key file. Access tokens
//! are obtained with the JWT-bearer grant and cached until shortly before
//! they expire.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::Mutex;

pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the provider-declared expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The parts of a service-account key file that matter for token exchange.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}
impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).or_raise(|| ErrorKind::Credential("malformed service account JSON".to_string()))
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .or_raise(|| ErrorKind::Credential(format!("cannot read key file {}", path.display())))?;
        Self::from_json(&json)
    }

    /// Looks for a key in the `env_var` environment variable first, then in
    /// `key_file`. Finding neither is [`ErrorKind::Unavailable`].
    pub async fn discover(env_var: &str, key_file: &Path) -> Result<Self> {
        if let Ok(json) = std::env::var(env_var)
            && !json.trim().is_empty()
        {
            tracing::info!(source = env_var, "Loading credentials from environment variable");
            return Self::from_json(&json);
        }
        if tokio::fs::try_exists(key_file).await.unwrap_or(false) {
            tracing::info!(source = %key_file.display(), "Loading credentials from key file");
            return Self::from_file(key_file).await;
        }
        exn::bail!(ErrorKind::Unavailable(format!(
            "no credentials found; set {env_var} or provide {}",
            key_file.display()
        )));
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// Exchanges signed assertions for access tokens and caches the result.
pub struct ServiceAccount {
    key: ServiceAccountKey,
    signer: EncodingKey,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}
impl ServiceAccount {
    /// Fails fast on a private key that is not a valid RSA PEM, so a broken
    /// credential is detected at startup instead of on the first request.
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>) -> Result<Self> {
        let signer = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .or_raise(|| ErrorKind::Credential("private key is not a valid RSA PEM".to_string()))?;
        Ok(Self {
            key,
            signer,
            scope: scope.into(),
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self, now: OffsetDateTime) -> Result<String> {
        let iat = now.unix_timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signer)
            .or_raise(|| ErrorKind::Credential("failed to sign token assertion".to_string()))
    }

    /// Returns a valid access token, exchanging a fresh assertion when the
    /// cached one is missing or about to expire. Concurrent callers wait on
    /// the same refresh rather than each minting their own token.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }
        let assertion = self.assertion(OffsetDateTime::now_utc())?;
        let response = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .or_raise(|| ErrorKind::Network("token exchange request failed".to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            exn::bail!(ErrorKind::Credential(format!("token exchange rejected ({status}): {body}")));
        }
        let body: TokenResponse = response.json().await.or_raise(|| ErrorKind::InvalidData("token response"))?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        let refresh_at = Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN);
        tracing::debug!(account = %self.key.client_email, lifetime = lifetime.as_secs(), "Obtained access token");
        let value = body.access_token.clone();
        *cached = Some(AccessToken {
            value: body.access_token,
            refresh_at,
        });
        Ok(value)
    }
}
