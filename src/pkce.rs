use std::fmt;

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::{AuthError, Result};

/// PKCE code verifier and its S256 challenge
///
/// A fresh verifier is generated for every authorization attempt and never
/// persisted. The raw value only leaves the process in the token exchange.
#[derive(Clone)]
pub struct Verifier {
    secret: String,
    challenge: String,
}

impl Verifier {
    /// Generate a new verifier from the operating system's entropy source
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Entropy`] if the entropy source cannot be read.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::Entropy(e.to_string()))?;
        let secret = general_purpose::URL_SAFE_NO_PAD.encode(bytes);
        let challenge = challenge_for(&secret);
        Ok(Self { secret, challenge })
    }

    /// Raw verifier sent to the token endpoint
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// base64url(SHA-256(verifier)) without padding
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    pub fn method(&self) -> &'static str {
        "S256"
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("secret", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

fn challenge_for(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_shape() {
        let verifier = Verifier::generate().unwrap();
        assert_eq!(verifier.secret().len(), 43);
        assert_eq!(verifier.challenge().len(), 43);
        assert!(!verifier.challenge().contains('='));
        assert_eq!(verifier.method(), "S256");
    }

    #[test]
    fn test_challenge_matches_rfc7636_vector() {
        // RFC 7636 appendix B
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_each_verifier_is_fresh() {
        let a = Verifier::generate().unwrap();
        let b = Verifier::generate().unwrap();
        assert_ne!(a.secret(), b.secret());
        assert_ne!(a.challenge(), b.challenge());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let verifier = Verifier::generate().unwrap();
        let printed = format!("{:?}", verifier);
        assert!(!printed.contains(verifier.secret()));
        assert!(printed.contains("<redacted>"));
    }
}
