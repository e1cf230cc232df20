use jsonwebtoken::jwk::JwkSet;
use tracing::debug;
use url::Url;

use crate::error::TokenKind;
use crate::jwt::{self, Claims};
use crate::{AuthConfig, AuthError, Result, TokenResponse, Verifier};

/// Identity provider client for the authorization-code-with-PKCE flow
///
/// Builds the browser-facing authorization URL, redeems the authorization
/// code at the token endpoint and verifies the returned tokens against the
/// provider's published key set.
///
/// # Example
///
/// ```no_run
/// use browser_auth::{AuthClient, AuthConfig, TokenKind, Verifier};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AuthClient::new(AuthConfig::default())?;
/// let verifier = Verifier::generate()?;
///
/// println!("Visit: {}", client.authorization_url(&verifier)?);
/// // Receive the code on the redirect URI...
///
/// let tokens = client.exchange_code(verifier.secret(), "code").await?;
/// let claims = client.verify_token(TokenKind::Id, &tokens.id_token).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: AuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    /// Create a new client for the given provider configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider URL is not a valid URL, the client ID
    /// is empty or the HTTP client cannot be constructed
    pub fn new(config: AuthConfig) -> Result<Self> {
        Url::parse(&config.provider_url)?;
        if config.client_id.trim().is_empty() {
            return Err(AuthError::InvalidConfig("client_id must not be empty".into()));
        }
        let http = reqwest::Client::builder().build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the authorization URL the user's browser is sent to
    ///
    /// The result depends only on the verifier's challenge and the
    /// configuration, so repeated calls return the same string.
    pub fn authorization_url(&self, verifier: &Verifier) -> Result<String> {
        let mut url = Url::parse(&self.config.authorize_url())?;
        url.query_pairs_mut()
            .append_pair("audience", &self.config.audience)
            .append_pair("scope", "openid")
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("code_challenge", verifier.challenge())
            .append_pair("code_challenge_method", verifier.method())
            .append_pair("redirect_uri", &self.config.redirect_uri());

        Ok(url.to_string())
    }

    /// Exchange an authorization code and the raw PKCE verifier for tokens
    ///
    /// The `redirect_uri` sent here is the local origin; the provider only
    /// compares it, nothing is redirected. No retries are attempted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidAuthorizationCode`] for empty inputs,
    /// [`AuthError::Network`] on transport failure, [`AuthError::Http`] for any
    /// status other than 200 OK and [`AuthError::Serialization`] if the body is
    /// not a token response.
    pub async fn exchange_code(&self, verifier: &str, code: &str) -> Result<TokenResponse> {
        if verifier.is_empty() || code.is_empty() {
            return Err(AuthError::InvalidAuthorizationCode);
        }

        let redirect_origin = self.config.redirect_origin();
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier),
            ("code", code),
            ("redirect_uri", redirect_origin.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url())
            .header("content-type", "application/x-www-form-urlencoded")
            .form(&params)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Http { status, body });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch the provider's JSON Web Key Set
    pub async fn fetch_jwks(&self) -> Result<JwkSet> {
        let response = self.http.get(self.config.jwks_url()).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Http { status, body });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Verify a provider token and return its claims
    ///
    /// The key set is fetched on every call.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SignatureVerification`] if the key set cannot be
    /// fetched or the token fails verification for any reason
    pub async fn verify_token(&self, kind: TokenKind, token: &str) -> Result<Claims> {
        let fail = |e: AuthError| {
            debug!(%kind, error = %e, "token verification failed");
            AuthError::SignatureVerification {
                kind,
                reason: e.to_string(),
            }
        };

        let jwks = self.fetch_jwks().await.map_err(fail)?;
        jwt::verify_signature(&jwks, token, &self.config.allowed_algorithms).map_err(fail)
    }
}
