use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_token::RejectReason;
use serde::Serialize;
use thiserror::Error;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Failures of the sign-in redirect flow. Each maps to the stable code that
/// is placed in the `?error=` query of the landing page.
#[derive(Debug, Clone, Error)]
pub enum CallbackError {
    #[error("state parameter missing or does not match cookie")]
    InvalidState,
    #[error("authorization code exchange failed: {0}")]
    Exchange(String),
    #[error("token endpoint response carried no id_token")]
    MissingIdToken,
    #[error("id token rejected: {0}")]
    IdToken(String),
    #[error("id token nonce does not match cookie")]
    NonceMismatch,
    #[error("email is unverified or outside the allowed domain")]
    DomainNotAllowed,
}

impl CallbackError {
    pub fn code(&self) -> &'static str {
        match self {
            CallbackError::InvalidState => "state",
            CallbackError::Exchange(_) => "exchange",
            CallbackError::MissingIdToken => "no_id",
            CallbackError::IdToken(_) => "id_token",
            CallbackError::NonceMismatch => "nonce",
            CallbackError::DomainNotAllowed => "domain",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for CallbackError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::IdToken(value.to_string())
    }
}

/// Rejection body of the verification endpoint.
#[derive(Debug, Serialize)]
pub struct VerifyErrorBody {
    pub ok: bool,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    Rejected(RejectReason),
    NoToken,
    BadRequest,
}

impl VerifyError {
    pub fn reason(&self) -> &'static str {
        match self {
            VerifyError::Rejected(reason) => reason.as_str(),
            VerifyError::NoToken => "no_token",
            VerifyError::BadRequest => "bad_request",
        }
    }
}

impl From<RejectReason> for VerifyError {
    fn from(value: RejectReason) -> Self {
        Self::Rejected(value)
    }
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        let reason = self.reason();
        let body = VerifyErrorBody { ok: false, reason };
        let mut resp = (StatusCode::BAD_REQUEST, Json(body)).into_response();
        resp.headers_mut()
            .insert(ERROR_CODE_HEADER, HeaderValue::from_static(reason));
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn callback_codes_are_distinct() {
        let errors = [
            CallbackError::InvalidState,
            CallbackError::Exchange("boom".into()),
            CallbackError::MissingIdToken,
            CallbackError::IdToken("bad".into()),
            CallbackError::NonceMismatch,
            CallbackError::DomainNotAllowed,
        ];
        let mut codes: Vec<_> = errors.iter().map(CallbackError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[tokio::test]
    async fn verify_error_shape() {
        let resp = VerifyError::from(RejectReason::Expired).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers().get(ERROR_CODE_HEADER).unwrap(), "expired");
        let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"ok": false, "reason": "expired"}));
    }
}
