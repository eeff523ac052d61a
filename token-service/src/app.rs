use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use common_token::{OpaqueTokenSigner, OpaqueTokenVerifier, SystemClock, TimeSource};
use prometheus::TEXT_FORMAT;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::auth_handlers::{callback, start};
use crate::config::ServiceConfig;
use crate::cookies::CookiePolicy;
use crate::metrics::TokenMetrics;
use crate::oidc::IdentityProvider;
use crate::pages::{home_page, token_page, verify_page};
use crate::policy::DomainPolicy;
use crate::verify_handlers::verify_token;

#[derive(Clone)]
pub struct AppState {
    pub signer: Arc<OpaqueTokenSigner>,
    pub verifier: Arc<OpaqueTokenVerifier>,
    pub provider: Arc<dyn IdentityProvider>,
    pub policy: Arc<DomainPolicy>,
    pub cookies: CookiePolicy,
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<TokenMetrics>,
}

impl AppState {
    pub fn new(config: ServiceConfig, provider: Arc<dyn IdentityProvider>) -> Result<Self> {
        Self::with_clock(config, provider, Arc::new(SystemClock))
    }

    /// Build state whose signer and verifier read `clock` instead of the wall clock.
    pub fn with_clock(
        config: ServiceConfig,
        provider: Arc<dyn IdentityProvider>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        let signer = OpaqueTokenSigner::new(config.token_secret.clone(), config.token_ttl_seconds)
            .context("Invalid token signer configuration")?
            .with_clock(clock.clone());

        let mut verifier = OpaqueTokenVerifier::new(config.token_secret.clone()).with_clock(clock);
        if let Some(ceiling) = config.token_max_lifetime_seconds {
            verifier = verifier
                .with_lifetime_ceiling(ceiling)
                .context("Invalid token lifetime ceiling")?;
        }

        Ok(Self {
            signer: Arc::new(signer),
            verifier: Arc::new(verifier),
            provider,
            policy: Arc::new(DomainPolicy::new(&config.allowed_domain)),
            cookies: CookiePolicy::from_config(&config),
            config: Arc::new(config),
            metrics: Arc::new(TokenMetrics::new()?),
        })
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            error!(error = %err, "Unable to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Verification is open to any relying party.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(home_page))
        .route("/token", get(token_page))
        .route("/verify", get(verify_page))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/auth/google/start", get(start))
        .route("/api/auth/google/callback", get(callback))
        .route("/api/verify", post(verify_token))
        .with_state(state)
        .layer(cors)
}
