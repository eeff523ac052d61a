use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use urlencoding::encode;

use crate::error::CallbackError;

pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";
pub const DEFAULT_SCOPE: &str = "openid email";

/// OpenID Connect client registration and provider endpoints.
#[derive(Clone)]
pub struct OidcSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_url: String,
    pub issuer: String,
    pub scope: String,
}

impl OidcSettings {
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            authorization_endpoint: GOOGLE_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            issuer: GOOGLE_ISSUER.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Where to send the browser to start an authorization-code flow.
    pub fn authorization_url(&self, state: &str, nonce: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&nonce={}",
            self.authorization_endpoint,
            encode(&self.client_id),
            encode(&self.redirect_url),
            encode(&self.scope),
            encode(state),
            encode(nonce),
        )
    }
}

impl std::fmt::Debug for OidcSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***redacted***")
            .field("redirect_url", &self.redirect_url)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Attributes asserted by the provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub email_verified: bool,
    pub nonce: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorization_url(&self, state: &str, nonce: &str) -> String;

    /// Exchange an authorization code and return the verified ID token claims.
    async fn authenticate(&self, code: &str) -> Result<VerifiedIdentity, CallbackError>;
}

/// Google as an OpenID Connect provider. ID tokens are checked against the
/// provider's published RSA keys, which are cached by `kid`.
pub struct GoogleProvider {
    settings: OidcSettings,
    client: Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl GoogleProvider {
    pub fn new(settings: OidcSettings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(client: Client, settings: OidcSettings) -> Self {
        Self {
            settings,
            client,
            keys: RwLock::new(HashMap::new()),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<String, CallbackError> {
        let form = [
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", self.settings.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .client
            .post(&self.settings.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|err| CallbackError::Exchange(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CallbackError::Exchange(format!(
                "HTTP {} from token endpoint",
                response.status()
            )));
        }

        let body: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|err| CallbackError::Exchange(err.to_string()))?;
        body.id_token
            .filter(|token| !token.is_empty())
            .ok_or(CallbackError::MissingIdToken)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, CallbackError> {
        if let Some(key) = self.cached_key(kid) {
            return Ok(key);
        }
        self.refresh_keys().await?;
        self.cached_key(kid)
            .ok_or_else(|| CallbackError::IdToken(format!("no published key for kid '{kid}'")))
    }

    fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let guard = self.keys.read().expect("rwlock poisoned");
        guard.get(kid).cloned()
    }

    async fn refresh_keys(&self) -> Result<usize, CallbackError> {
        let response = self
            .client
            .get(&self.settings.jwks_url)
            .send()
            .await
            .map_err(|err| CallbackError::IdToken(format!("JWKS fetch failed: {err}")))?;
        if !response.status().is_success() {
            return Err(CallbackError::IdToken(format!(
                "JWKS fetch returned HTTP {}",
                response.status()
            )));
        }
        let body: JwksResponse = response
            .json()
            .await
            .map_err(|err| CallbackError::IdToken(format!("JWKS decode failed: {err}")))?;

        let mut fetched = HashMap::new();
        for key in body.keys {
            // Skip anything that cannot verify RS256 signatures.
            let (Some(kid), Some(n), Some(e)) = (key.kid, key.n, key.e) else {
                continue;
            };
            if key.kty.as_deref().unwrap_or("RSA") != "RSA" {
                continue;
            }
            if key.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                continue;
            }
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(decoding_key) => {
                    fetched.insert(kid, decoding_key);
                }
                Err(err) => debug!(%kid, error = %err, "ignoring unparsable JWKS entry"),
            }
        }

        let count = fetched.len();
        if count > 0 {
            let mut guard = self.keys.write().expect("rwlock poisoned");
            *guard = fetched;
        }
        debug!(count, "refreshed provider signing keys");
        Ok(count)
    }

    async fn verify_id_token(&self, raw: &str) -> Result<VerifiedIdentity, CallbackError> {
        let header = decode_header(raw)?;
        let kid = header
            .kid
            .ok_or_else(|| CallbackError::IdToken("token missing kid header".to_string()))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.set_audience(&[self.settings.client_id.as_str()]);

        let data = decode::<IdTokenClaims>(raw, &key, &validation)?;
        let claims = data.claims;
        Ok(VerifiedIdentity {
            email: claims.email.unwrap_or_default(),
            email_verified: claims
                .email_verified
                .map(EmailVerified::is_true)
                .unwrap_or(false),
            nonce: claims.nonce,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        self.settings.authorization_url(state, nonce)
    }

    async fn authenticate(&self, code: &str) -> Result<VerifiedIdentity, CallbackError> {
        let raw = self.exchange_code(code).await?;
        self.verify_id_token(&raw).await
    }
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<EmailVerified>,
    #[serde(default)]
    nonce: Option<String>,
}

/// Providers emit either a JSON boolean or the string "true".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmailVerified {
    Flag(bool),
    Text(String),
}

impl EmailVerified {
    fn is_true(self) -> bool {
        match self {
            EmailVerified::Flag(flag) => flag,
            EmailVerified::Text(text) => text.eq_ignore_ascii_case("true"),
        }
    }
}
