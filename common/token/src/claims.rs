use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The entire trusted payload of a token.
///
/// Only timestamps are carried. Decoding refuses any additional field so a
/// token can never smuggle identifying data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    pub fn new(iat: i64, exp: i64) -> Self {
        Self { iat, exp }
    }

    /// Claims valid for `ttl_seconds` starting at `now`.
    pub fn starting_at(now: i64, ttl_seconds: i64) -> Self {
        Self {
            iat: now,
            exp: now.saturating_add(ttl_seconds),
        }
    }

    /// Expired once `exp` is at or before `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    pub fn lifetime_seconds(&self) -> i64 {
        self.exp.saturating_sub(self.iat)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }
}
