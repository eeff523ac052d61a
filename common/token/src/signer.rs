use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::claims::Claims;
use crate::clock::{SystemClock, TimeSource};
use crate::codec;
use crate::error::{DecodeError, RejectReason, TokenError};
use crate::secret::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

pub const SEGMENT_SEPARATOR: char = '.';

/// Build `encodedClaims.tag` for the given claims.
pub fn issue(claims: &Claims, secret: &SigningSecret) -> String {
    let encoded_claims = codec::encode(claims);
    let tag = codec::encode_segment(compute_tag(secret, encoded_claims.as_bytes()));
    format!("{encoded_claims}{SEGMENT_SEPARATOR}{tag}")
}

/// Authenticate `token` and check it against `now`.
///
/// The tag is checked before the claims segment is parsed, and the
/// comparison runs in constant time.
pub fn verify(token: &str, secret: &SigningSecret, now: i64) -> Result<Claims, RejectReason> {
    let (encoded_claims, encoded_tag) = split_token(token)?;

    let expected = compute_tag(secret, encoded_claims.as_bytes());
    let received = match codec::decode_segment(encoded_tag) {
        Ok(bytes) => bytes,
        // In-alphabet tag of the right length with stray bits in its final
        // symbol: it can never match, so report it as a bad signature.
        Err(DecodeError::Base64(base64::DecodeError::InvalidLastSymbol(..))) => {
            return Err(RejectReason::Signature)
        }
        Err(_) => return Err(RejectReason::Payload),
    };
    if !bool::from(expected.as_slice().ct_eq(received.as_slice())) {
        return Err(RejectReason::Signature);
    }

    let claims = codec::decode(encoded_claims).map_err(|_| RejectReason::Payload)?;
    if claims.is_expired_at(now) {
        return Err(RejectReason::Expired);
    }
    Ok(claims)
}

fn split_token(token: &str) -> Result<(&str, &str), RejectReason> {
    let mut segments = token.split(SEGMENT_SEPARATOR);
    match (segments.next(), segments.next(), segments.next()) {
        (Some(claims), Some(tag), None) => Ok((claims, tag)),
        _ => Err(RejectReason::Format),
    }
}

fn compute_tag(secret: &SigningSecret, message: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// A freshly issued token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues tokens valid for a fixed time-to-live.
pub struct OpaqueTokenSigner {
    secret: SigningSecret,
    clock: Arc<dyn TimeSource>,
    ttl_seconds: i64,
}

impl OpaqueTokenSigner {
    pub fn new(secret: SigningSecret, ttl_seconds: i64) -> Result<Self, TokenError> {
        if ttl_seconds < 1 {
            return Err(TokenError::InvalidTtl(ttl_seconds));
        }
        Ok(Self {
            secret,
            clock: Arc::new(SystemClock),
            ttl_seconds,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(&self, claims: &Claims) -> String {
        issue(claims, &self.secret)
    }

    /// Issue a token whose lifetime starts at the current clock reading.
    pub fn issue_now(&self) -> IssuedToken {
        let claims = Claims::starting_at(self.clock.now(), self.ttl_seconds);
        let token = self.issue(&claims);
        debug!(exp = claims.exp, "issued opaque token");
        IssuedToken { token, claims }
    }
}

/// Verifies tokens against a shared secret and the current clock.
pub struct OpaqueTokenVerifier {
    secret: SigningSecret,
    clock: Arc<dyn TimeSource>,
    lifetime_ceiling: Option<i64>,
}

impl OpaqueTokenVerifier {
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            clock: Arc::new(SystemClock),
            lifetime_ceiling: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Reject authentic tokens whose `exp - iat` exceeds `seconds`, or whose
    /// `exp` is not after `iat`.
    pub fn with_lifetime_ceiling(mut self, seconds: i64) -> Result<Self, TokenError> {
        if seconds < 1 {
            return Err(TokenError::InvalidTtl(seconds));
        }
        self.lifetime_ceiling = Some(seconds);
        Ok(self)
    }

    pub fn lifetime_ceiling(&self) -> Option<i64> {
        self.lifetime_ceiling
    }

    pub fn verify(&self, token: &str) -> Result<Claims, RejectReason> {
        let now = self.clock.now();
        let outcome = verify(token, &self.secret, now).and_then(|claims| {
            match self.lifetime_ceiling {
                Some(ceiling) if claims.exp <= claims.iat || claims.lifetime_seconds() > ceiling => {
                    Err(RejectReason::Payload)
                }
                _ => Ok(claims),
            }
        });

        match &outcome {
            Ok(claims) => debug!(exp = claims.exp, "verified opaque token"),
            Err(reason) => debug!(%reason, "rejected opaque token"),
        }
        outcome
    }
}
