//! Access tokens for the Firestore REST API.
//!
//! [`ServiceAccount`] implements the OAuth 2.0 JWT-bearer flow: sign a short
//! RS256 assertion with the key's private key, trade it at `token_uri` for a
//! bearer token, and reuse that token until shortly before it expires.
//! [`StaticToken`] serves a fixed token (emulators, pre-issued tokens, tests).

use crate::document::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, StoreError>;
}

/// A fixed bearer token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, StoreError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Service account
// ---------------------------------------------------------------------------

/// The fields of a Google service-account JSON key that matter here.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Credentials {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Key(e.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: String,
    refresh_at: DateTime<Utc>,
}

pub struct ServiceAccount {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, StoreError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            key,
            signing_key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    /// The signed JWT assertion presented to `token_uri`.
    pub fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, StoreError> {
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.signing_key,
        )?)
    }

    async fn exchange(&self) -> Result<CachedToken, StoreError> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StoreError::Auth(format!("{status}: {text}")));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&text).map_err(|e| StoreError::Auth(e.to_string()))?;
        tracing::debug!(expires_in = parsed.expires_in, "obtained access token");
        Ok(CachedToken {
            token: parsed.access_token,
            refresh_at: now + Duration::seconds(parsed.expires_in - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccount {
    async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Utc::now() < t.refresh_at) {
            return Ok(token.token.clone());
        }
        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
