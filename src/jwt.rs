use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{AuthError, Result};

/// Verified claims of a provider token, keyed by claim name
pub type Claims = Map<String, Value>;

/// Custom claim carrying the application session
#[derive(Debug, Deserialize)]
struct SessionClaims {
    ui_token: UiToken,
}

#[derive(Debug, Deserialize)]
struct UiToken {
    access_token: String,
}

/// Verify a token's signature against a key set and return its claims
///
/// The signing key is selected by the token's `kid` header; a token without a
/// `kid` is only accepted when the set holds exactly one key. Expiry is
/// enforced. Audience and issuer are not checked: the trust anchor is the
/// provider's signature.
///
/// # Errors
///
/// Returns an error if the header is malformed, the algorithm is not in
/// `allowed`, no key matches, or the signature or expiry check fails.
pub fn verify_signature(jwks: &JwkSet, token: &str, allowed: &[Algorithm]) -> Result<Claims> {
    let header = decode_header(token)?;

    if !allowed.contains(&header.alg) {
        return Err(AuthError::InvalidJwt(format!(
            "token signed with disallowed algorithm {:?}",
            header.alg
        )));
    }

    let jwk = find_key(jwks, header.kid.as_deref()).ok_or_else(|| {
        AuthError::InvalidJwt(format!(
            "no matching key in key set for kid {:?}",
            header.kid
        ))
    })?;
    let key = DecodingKey::from_jwk(jwk)?;

    let mut validation = Validation::new(header.alg);
    validation.validate_aud = false;

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

fn find_key<'a>(jwks: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => jwks.find(kid),
        None if jwks.keys.len() == 1 => jwks.keys.first(),
        None => None,
    }
}

/// Extract the session token from an ID token's verified claims
///
/// The value lives at `ui_token.access_token` and must be a non-empty string.
///
/// # Errors
///
/// Returns [`AuthError::ClaimExtraction`] on any missing key, type mismatch or
/// empty value.
pub fn extract_session_token(claims: &Claims) -> Result<String> {
    let session: SessionClaims = serde_json::from_value(Value::Object(claims.clone()))
        .map_err(|_| AuthError::ClaimExtraction)?;

    if session.ui_token.access_token.is_empty() {
        return Err(AuthError::ClaimExtraction);
    }
    Ok(session.ui_token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &[u8] = b"local-callback-test-signing-key-0123456789abc";
    const SECRET_B64: &str = "bG9jYWwtY2FsbGJhY2stdGVzdC1zaWduaW5nLWtleS0wMTIzNDU2Nzg5YWJj";

    fn jwks() -> JwkSet {
        serde_json::from_value(json!({
            "keys": [{ "kty": "oct", "kid": "test-key", "alg": "HS256", "k": SECRET_B64 }]
        }))
        .unwrap()
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn sign(claims: Value, kid: Option<&str>, secret: &[u8]) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn claims(value: Value) -> Claims {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_verify_returns_claims() {
        let token = sign(
            json!({ "sub": "user", "exp": now() + 3600, "aud": "cli" }),
            Some("test-key"),
            SECRET,
        );
        let claims = verify_signature(&jwks(), &token, &[Algorithm::HS256]).unwrap();
        assert_eq!(claims["sub"], "user");
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let token = sign(
            json!({ "exp": now() + 3600 }),
            Some("test-key"),
            b"some-other-signing-key",
        );
        assert!(verify_signature(&jwks(), &token, &[Algorithm::HS256]).is_err());
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let token = sign(json!({ "exp": now() - 3600 }), Some("test-key"), SECRET);
        assert!(verify_signature(&jwks(), &token, &[Algorithm::HS256]).is_err());
    }

    #[test]
    fn test_verify_rejects_disallowed_algorithm() {
        let token = sign(json!({ "exp": now() + 3600 }), Some("test-key"), SECRET);
        assert!(verify_signature(&jwks(), &token, &[Algorithm::RS256]).is_err());
    }

    #[test]
    fn test_verify_without_kid_uses_single_key() {
        let token = sign(json!({ "exp": now() + 3600 }), None, SECRET);
        assert!(verify_signature(&jwks(), &token, &[Algorithm::HS256]).is_ok());

        let token = sign(json!({ "exp": now() + 3600 }), Some("rotated-away"), SECRET);
        assert!(verify_signature(&jwks(), &token, &[Algorithm::HS256]).is_err());
    }

    #[test]
    fn test_verify_rejects_malformed_token() {
        assert!(verify_signature(&jwks(), "not-a-jwt", &[Algorithm::HS256]).is_err());
    }

    #[test]
    fn test_extract_session_token() {
        let claims = claims(json!({ "ui_token": { "access_token": "abc123" } }));
        assert_eq!(extract_session_token(&claims).unwrap(), "abc123");
    }

    #[test]
    fn test_extract_session_token_fails_closed() {
        for value in [
            json!({}),
            json!({ "ui_token": {} }),
            json!({ "ui_token": "abc123" }),
            json!({ "ui_token": { "access_token": "" } }),
            json!({ "ui_token": { "access_token": 42 } }),
        ] {
            let result = extract_session_token(&claims(value));
            assert!(matches!(result, Err(AuthError::ClaimExtraction)));
        }
    }
}
