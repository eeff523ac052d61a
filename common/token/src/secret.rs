use zeroize::Zeroizing;

use crate::error::TokenError;

/// Shared HMAC key used by both issuer and verifier.
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    /// Construct a secret from raw bytes. Empty input is rejected.
    pub fn from_bytes<B>(bytes: B) -> Result<Self, TokenError>
    where
        B: AsRef<[u8]>,
    {
        let slice = bytes.as_ref();
        if slice.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self(Zeroizing::new(slice.to_vec())))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::str::FromStr for SigningSecret {
    type Err = TokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(value.as_bytes())
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("bytes", &"***redacted***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(
            SigningSecret::from_bytes(b"").err(),
            Some(TokenError::EmptySecret)
        );
        assert!("".parse::<SigningSecret>().is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let secret: SigningSecret = "hunter2".parse().expect("secret");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("redacted"));
    }
}
