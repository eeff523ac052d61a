//! Claims <-> URL-safe text.
//!
//! Claims are serialized as compact JSON (`{"iat":..,"exp":..}`) and then
//! base64url-encoded without padding. Padding is implied by the segment
//! length, so a segment whose length is 1 mod 4 can never decode.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::claims::Claims;
use crate::error::DecodeError;

/// Encode raw bytes as an unpadded base64url segment.
pub fn encode_segment(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode an unpadded base64url segment.
///
/// Non-canonical trailing bits are rejected, so every byte string has
/// exactly one accepted encoding.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    if let Some(bad) = segment.chars().find(|ch| !is_url_safe(*ch)) {
        return Err(DecodeError::Alphabet(bad));
    }
    Ok(URL_SAFE_NO_PAD.decode(segment)?)
}

pub fn encode(claims: &Claims) -> String {
    // Serializing two i64 fields cannot fail.
    let json = serde_json::to_vec(claims).unwrap_or_default();
    encode_segment(json)
}

/// Decode a claims segment. Only a JSON object is accepted; the positional
/// `[iat, exp]` form that serde would otherwise take is refused.
pub fn decode(segment: &str) -> Result<Claims, DecodeError> {
    let bytes = decode_segment(segment)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

fn is_url_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}
