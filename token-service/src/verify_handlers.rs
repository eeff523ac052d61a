use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use common_token::Claims;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VerifyError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    pub payload: Claims,
}

pub async fn verify_token(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, VerifyError> {
    let outcome = check_token(&state, body);
    match &outcome {
        Ok(_) => state.metrics.verification("ok"),
        Err(err) => state.metrics.verification(err.reason()),
    }
    outcome
}

fn check_token(
    state: &AppState,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, VerifyError> {
    let Json(request) = body.map_err(|_| VerifyError::BadRequest)?;
    let text = token_text(request.token)?;
    // Pasted tokens often carry surrounding whitespace.
    let token = text
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(VerifyError::NoToken)?;

    let payload = state.verifier.verify(token)?;
    Ok(Json(VerifyResponse { ok: true, payload }))
}

/// Scalar tokens are read as their text; `null`, `false` and `0` count as
/// absent. Arrays and objects are not tokens at all.
fn token_text(value: Option<Value>) -> Result<Option<String>, VerifyError> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some("true".to_string())),
        Some(Value::Number(number)) if number.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(VerifyError::BadRequest),
    }
}
