//! Stateless, anonymous bearer tokens.
//!
//! A token is `base64url(json{iat,exp}) "." base64url(HMAC-SHA256)`. It
//! carries no identifying data and can be verified by any holder of the
//! shared secret without contacting the issuer.

pub mod claims;
pub mod clock;
pub mod codec;
pub mod error;
pub mod secret;
pub mod signer;

pub use claims::Claims;
pub use clock::{FixedClock, SystemClock, TimeSource};
pub use error::{DecodeError, RejectReason, TokenError};
pub use secret::SigningSecret;
pub use signer::{issue, verify, IssuedToken, OpaqueTokenSigner, OpaqueTokenVerifier};
