use std::collections::HashMap;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::OidcSettings;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("provider discovery failed: {0}")]
    Discovery(String),

    #[error("code exchange failed: {0}")]
    Exchange(String),

    #[error("provider returned no id_token")]
    MissingIdToken,

    #[error("no JWKS key matches the token's key ID")]
    KeyNotFound,

    #[error("id_token verification failed: {0}")]
    InvalidIdToken(String),

    #[error("id_token carries no email claim")]
    MissingEmail,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// The subset of the provider's discovery document we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Identity claims pulled from a verified ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    /// Token expiry, unix seconds. Drives the TTL of the stored raw token.
    #[serde(default)]
    pub exp: Option<i64>,
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

impl IdentityClaims {
    /// Best-effort (first, last) name: structured claims win, then the
    /// display name split into whitespace fields, then empty strings.
    #[must_use]
    pub fn split_name(&self) -> (String, String) {
        match (&self.given_name, &self.family_name) {
            (Some(first), Some(last)) => (first.clone(), last.clone()),
            (Some(first), None) => (first.clone(), String::new()),
            _ => match &self.name {
                Some(full) => crate::db::repositories::user::split_full_name(full),
                None => (String::new(), String::new()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// Client for a single OpenID Connect provider: builds the authorization
/// redirect, exchanges codes, and verifies ID tokens against the
/// provider's published keys.
pub struct OidcClient {
    settings: OidcSettings,
    metadata: ProviderMetadata,
    http: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl OidcClient {
    /// Construct from already-known provider metadata. Used by tests and
    /// by [`Self::discover`].
    #[must_use]
    pub fn new(settings: OidcSettings, metadata: ProviderMetadata) -> Self {
        Self {
            settings,
            metadata,
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the provider's discovery document and construct a client.
    pub async fn discover(settings: OidcSettings) -> Result<Self, OidcError> {
        let url = format!(
            "{}/.well-known/openid-configuration",
            settings.issuer_url.trim_end_matches('/')
        );

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| OidcError::Discovery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OidcError::Discovery(format!(
                "discovery endpoint returned {}",
                response.status()
            )));
        }

        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| OidcError::Discovery(e.to_string()))?;

        debug!(issuer = %metadata.issuer, "OIDC provider discovered");

        Ok(Self {
            settings,
            metadata,
            http,
            keys: RwLock::new(HashMap::new()),
        })
    }

    /// Opaque random value carried through the authorization round-trip.
    #[must_use]
    pub fn generate_state() -> String {
        use rand::Rng;

        let mut rng = rand::rng();
        let bytes: [u8; 32] = rng.random();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Where to send the browser to start the login.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.metadata.authorization_endpoint,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode("openid profile email"),
            urlencoding::encode(state),
        )
    }

    /// Provider logout URL carrying the stored ID token as a hint.
    #[must_use]
    pub fn logout_url(&self, id_token: &str, post_logout_redirect_uri: &str) -> String {
        format!(
            "{}?id_token_hint={}&post_logout_redirect_uri={}",
            self.settings.logout_url,
            urlencoding::encode(id_token),
            urlencoding::encode(post_logout_redirect_uri),
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OidcError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.metadata.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| OidcError::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "OIDC token exchange rejected");
            return Err(OidcError::Exchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        Ok(response.json().await.map_err(OidcError::Http)?)
    }

    /// Verify an ID token's signature against the provider's JWKS and
    /// return its identity claims. Checks issuer and audience.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<IdentityClaims, OidcError> {
        let header =
            decode_header(id_token).map_err(|e| OidcError::InvalidIdToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| OidcError::InvalidIdToken("token has no key ID".to_string()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.metadata.issuer]);
        validation.set_audience(&[&self.settings.client_id]);

        let data = decode::<IdentityClaims>(id_token, &key, &validation)
            .map_err(|e| OidcError::InvalidIdToken(e.to_string()))?;

        Ok(data.claims)
    }

    /// Look up a decoding key by ID, refreshing the JWKS cache on a miss
    /// so key rotation does not require a restart.
    async fn key_for(&self, kid: &str) -> Result<DecodingKey, OidcError> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        self.refresh_keys().await?;

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or(OidcError::KeyNotFound)
    }

    async fn refresh_keys(&self) -> Result<(), OidcError> {
        let jwks: Jwks = self
            .http
            .get(&self.metadata.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = self.keys.write().await;
        keys.clear();
        for jwk in jwks.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => warn!(%kid, error = %err, "Skipping unusable JWKS key"),
            }
        }

        debug!(count = keys.len(), "JWKS cache refreshed");
        Ok(())
    }
}
