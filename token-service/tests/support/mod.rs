use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use axum::Router;
use common_token::FixedClock;
use http_body_util::BodyExt;
use token_service::config::{CookieSameSite, ServiceConfig};
use token_service::error::CallbackError;
use token_service::oidc::{IdentityProvider, OidcSettings, VerifiedIdentity};
use token_service::{router, AppState};

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_NOW: i64 = 1_700_000_000;
pub const BASE_URL: &str = "https://tokens.example.test";

/// Identity provider double returning a scripted outcome.
pub struct FakeProvider {
    outcome: Mutex<Result<VerifiedIdentity, CallbackError>>,
    codes: Mutex<Vec<String>>,
}

impl FakeProvider {
    #[allow(dead_code)]
    pub fn returning(identity: VerifiedIdentity) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Ok(identity)),
            codes: Mutex::new(Vec::new()),
        })
    }

    #[allow(dead_code)]
    pub fn failing(err: CallbackError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Err(err)),
            codes: Mutex::new(Vec::new()),
        })
    }

    #[allow(dead_code)]
    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        format!("https://idp.example.test/auth?state={state}&nonce={nonce}")
    }

    async fn authenticate(&self, code: &str) -> Result<VerifiedIdentity, CallbackError> {
        self.codes.lock().unwrap().push(code.to_string());
        self.outcome.lock().unwrap().clone()
    }
}

#[allow(dead_code)]
pub fn student(nonce: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        email: "6530000021@student.chula.ac.th".to_string(),
        email_verified: true,
        nonce: Some(nonce.to_string()),
    }
}

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        token_secret: TEST_SECRET.parse().unwrap(),
        token_ttl_seconds: 3600,
        token_max_lifetime_seconds: None,
        allowed_domain: "student.chula.ac.th".to_string(),
        public_base_url: Some(BASE_URL.to_string()),
        oidc: OidcSettings::google(
            "client-id",
            "client-secret",
            format!("{BASE_URL}/api/auth/google/callback"),
        ),
        oauth_cookie_secure: true,
        oauth_cookie_same_site: CookieSameSite::Lax,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    }
}

pub struct TestApp {
    pub router: Router,
    #[allow(dead_code)]
    pub clock: Arc<FixedClock>,
}

pub fn test_app(config: ServiceConfig, provider: Arc<dyn IdentityProvider>) -> Result<TestApp> {
    let clock = Arc::new(FixedClock::new(TEST_NOW));
    let state = AppState::with_clock(config, provider, clock.clone())?;
    Ok(TestApp {
        router: router(state),
        clock,
    })
}

#[allow(dead_code)]
pub async fn body_string(response: Response<Body>) -> Result<String> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Result<serde_json::Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}
