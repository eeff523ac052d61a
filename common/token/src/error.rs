use serde::Serialize;
use thiserror::Error;

/// Errors raised while constructing signers, verifiers and secrets.
///
/// These are configuration faults, never verification outcomes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing secret must not be empty")]
    EmptySecret,
    #[error("token ttl must be at least 1 second, got {0}")]
    InvalidTtl(i64),
}

/// Failure to turn a text segment back into bytes or claims.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("segment contains '{0}' outside the url-safe alphabet")]
    Alphabet(char),
    #[error("segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("claims are not canonical: {0}")]
    Json(#[from] serde_json::Error),
    #[error("claims must be a JSON object")]
    NotAnObject,
}

/// Why a token was rejected.
///
/// The reason is deliberately coarse: callers can explain the outcome
/// without learning which byte or field was at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
    /// Not exactly two dot-separated segments.
    Format,
    /// Integrity tag mismatch (tampering or wrong secret).
    Signature,
    /// Tag or claims segment could not be decoded.
    Payload,
    /// Authentic, but `exp` is not in the future.
    Expired,
}

impl RejectReason {
    pub const ALL: [RejectReason; 4] = [
        RejectReason::Format,
        RejectReason::Signature,
        RejectReason::Payload,
        RejectReason::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Format => "format",
            RejectReason::Signature => "signature",
            RejectReason::Payload => "payload",
            RejectReason::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
