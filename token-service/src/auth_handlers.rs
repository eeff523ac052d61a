use axum::extract::{Query, State};
use axum::http::header::{HOST, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common_token::IssuedToken;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};
use urlencoding::encode;

use crate::config::{ServiceConfig, OAUTH_COOKIE_TTL_SECONDS};
use crate::cookies::{append_set_cookie, read_cookie};
use crate::error::CallbackError;
use crate::AppState;

pub const STATE_COOKIE: &str = "oauth_state";
pub const NONCE_COOKIE: &str = "oauth_nonce";

const FLOW_VALUE_BYTES: usize = 24;

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Begin sign-in: bind fresh state and nonce values to the browser and send
/// it to the identity provider.
pub async fn start(State(state): State<AppState>) -> Response {
    let flow_state = random_flow_value();
    let nonce = random_flow_value();
    let location = state.provider.authorization_url(&flow_state, &nonce);

    let mut response = redirect_found(&location);
    append_set_cookie(
        &mut response,
        &state
            .cookies
            .build(STATE_COOKIE, &flow_state, OAUTH_COOKIE_TTL_SECONDS),
    );
    append_set_cookie(
        &mut response,
        &state.cookies.build(NONCE_COOKIE, &nonce, OAUTH_COOKIE_TTL_SECONDS),
    );
    response
}

/// Finish sign-in. On success the token travels in the URL fragment so it
/// never reaches server logs.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let base = public_base_url(&state.config, &headers);

    match complete_sign_in(&state, &headers, params).await {
        Ok(issued) => {
            state.metrics.issuance("issued");
            info!(exp = issued.claims.exp, "issued anonymous token");

            let location = format!("{base}/token#token={}", encode(&issued.token));
            let mut response = redirect_found(&location);
            append_set_cookie(&mut response, &state.cookies.clear(STATE_COOKIE));
            append_set_cookie(&mut response, &state.cookies.clear(NONCE_COOKIE));
            response
        }
        Err(err) => {
            let code = err.code();
            state.metrics.issuance(code);
            warn!(code, error = %err, "sign-in callback rejected");
            redirect_found(&format!("{base}/?error={code}"))
        }
    }
}

async fn complete_sign_in(
    state: &AppState,
    headers: &HeaderMap,
    params: CallbackParams,
) -> Result<IssuedToken, CallbackError> {
    let code = non_empty(params.code).ok_or(CallbackError::InvalidState)?;
    let returned_state = non_empty(params.state).ok_or(CallbackError::InvalidState)?;
    let saved_state = read_cookie(headers, STATE_COOKIE).ok_or(CallbackError::InvalidState)?;
    if !constant_time_eq(&returned_state, &saved_state) {
        return Err(CallbackError::InvalidState);
    }

    let identity = state.provider.authenticate(&code).await?;

    let saved_nonce = read_cookie(headers, NONCE_COOKIE);
    match (identity.nonce.as_deref(), saved_nonce.as_deref()) {
        (Some(received), Some(saved)) if constant_time_eq(received, saved) => {}
        _ => return Err(CallbackError::NonceMismatch),
    }

    if !state.policy.permits(&identity) {
        return Err(CallbackError::DomainNotAllowed);
    }

    Ok(state.signer.issue_now())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

fn random_flow_value() -> String {
    let mut bytes = [0u8; FLOW_VALUE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The configured public origin, or the one the request arrived on.
pub(crate) fn public_base_url(config: &ServiceConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.clone();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(',').next().unwrap_or(value).trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let scheme = header("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = header("x-forwarded-host")
        .or_else(|| header(HOST.as_str()))
        .unwrap_or_else(|| "localhost".to_string());
    format!("{scheme}://{host}")
}

fn redirect_found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(err) => {
            error!(error = %err, "redirect location is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
