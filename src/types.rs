use std::time::Duration;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Path of the single route served by the local callback listener
pub const CALLBACK_PATH: &str = "/callback";

/// Token response from the provider's token endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token for the provider's API
    #[serde(default)]
    pub access_token: String,
    /// OIDC ID token carrying the custom session claim
    #[serde(default)]
    pub id_token: String,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: i64,
    /// HTTP authentication scheme of the access token (e.g. `Bearer`)
    #[serde(default)]
    pub token_type: String,
}

impl TokenResponse {
    /// Both token strings must be present for the flow to continue
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.id_token.is_empty()
    }
}

/// Outcome of a successful browser authorization
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Tokens returned by the provider
    pub tokens: TokenResponse,
    /// Application session token taken from the verified ID token
    pub session_token: String,
}

/// The single terminal value handed from the callback handler to the waiting flow
pub type FlowResult = Result<AuthSession>;

/// Configuration of the identity provider and the local listener
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the identity provider (authorize, token and JWKS endpoints hang off it)
    pub provider_url: String,
    /// Public OAuth client ID
    pub client_id: String,
    /// API audience requested in the authorization URL
    pub audience: String,
    /// Local port for the callback listener; `0` picks a free port
    pub callback_port: u16,
    /// Signing algorithms accepted when verifying provider tokens
    pub allowed_algorithms: Vec<Algorithm>,
    /// Upper bound on waiting for the browser; `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider_url: "https://dev-37kjpso9.us.auth0.com".to_string(),
            client_id: "7TAnqT4DTDhJTyXk9aXcuD48JoHRXK2X".to_string(),
            audience: "https://api.secretcdn-stg.net/".to_string(),
            callback_port: 8080,
            allowed_algorithms: vec![Algorithm::RS256],
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl AuthConfig {
    /// Create a new config builder
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Browser-facing authorization endpoint
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.base())
    }

    /// Token exchange endpoint
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base())
    }

    /// Published JSON Web Key Set
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.base())
    }

    /// Where the provider redirects the browser after login
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.redirect_origin(), CALLBACK_PATH)
    }

    /// Local origin echoed to the token endpoint; it is never redirected to
    pub fn redirect_origin(&self) -> String {
        format!("http://localhost:{}", self.callback_port)
    }

    /// Copy of this config pinned to the port the listener actually bound
    pub fn with_callback_port(&self, port: u16) -> Self {
        Self {
            callback_port: port,
            ..self.clone()
        }
    }

    fn base(&self) -> &str {
        self.provider_url.trim_end_matches('/')
    }
}

/// Builder for AuthConfig
#[derive(Debug, Clone, Default)]
pub struct AuthConfigBuilder {
    provider_url: Option<String>,
    client_id: Option<String>,
    audience: Option<String>,
    callback_port: Option<u16>,
    allowed_algorithms: Option<Vec<Algorithm>>,
    timeout: Option<Option<Duration>>,
}

impl AuthConfigBuilder {
    /// Set the identity provider base URL
    pub fn provider_url(mut self, provider_url: impl Into<String>) -> Self {
        self.provider_url = Some(provider_url.into());
        self
    }

    /// Set the OAuth client ID
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the requested API audience
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the local callback port
    pub fn callback_port(mut self, port: u16) -> Self {
        self.callback_port = Some(port);
        self
    }

    /// Set the accepted token signing algorithms
    pub fn allowed_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.allowed_algorithms = Some(algorithms.into_iter().collect());
        self
    }

    /// Bound the wait for the browser callback
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Some(timeout));
        self
    }

    /// Wait for the browser callback without a deadline
    pub fn no_timeout(mut self) -> Self {
        self.timeout = Some(None);
        self
    }

    /// Build the AuthConfig
    pub fn build(self) -> AuthConfig {
        let defaults = AuthConfig::default();
        AuthConfig {
            provider_url: self.provider_url.unwrap_or(defaults.provider_url),
            client_id: self.client_id.unwrap_or(defaults.client_id),
            audience: self.audience.unwrap_or(defaults.audience),
            callback_port: self.callback_port.unwrap_or(defaults.callback_port),
            allowed_algorithms: self
                .allowed_algorithms
                .unwrap_or(defaults.allowed_algorithms),
            timeout: self.timeout.unwrap_or(defaults.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_derive_from_provider_url() {
        let config = AuthConfig::builder()
            .provider_url("https://login.example.com/")
            .callback_port(9000)
            .build();

        assert_eq!(config.authorize_url(), "https://login.example.com/authorize");
        assert_eq!(config.token_url(), "https://login.example.com/oauth/token");
        assert_eq!(
            config.jwks_url(),
            "https://login.example.com/.well-known/jwks.json"
        );
        assert_eq!(config.redirect_uri(), "http://localhost:9000/callback");
        assert_eq!(config.redirect_origin(), "http://localhost:9000");
    }

    #[test]
    fn test_builder_keeps_defaults() {
        let config = AuthConfig::builder().client_id("cli").build();
        let defaults = AuthConfig::default();

        assert_eq!(config.client_id, "cli");
        assert_eq!(config.audience, defaults.audience);
        assert_eq!(config.callback_port, 8080);
        assert_eq!(config.allowed_algorithms, vec![Algorithm::RS256]);
        assert_eq!(config.timeout, Some(Duration::from_secs(300)));
        assert_eq!(AuthConfig::builder().no_timeout().build().timeout, None);
    }

    #[test]
    fn test_with_callback_port_rewrites_redirect() {
        let config = AuthConfig::builder().callback_port(0).build();
        let resolved = config.with_callback_port(43117);
        assert_eq!(resolved.redirect_uri(), "http://localhost:43117/callback");
        assert_eq!(resolved.client_id, config.client_id);
    }

    #[test]
    fn test_token_response_requires_both_tokens() {
        let tokens: TokenResponse =
            serde_json::from_str(r#"{"access_token":"AT1","expires_in":86400,"token_type":"Bearer"}"#)
                .unwrap();
        assert_eq!(tokens.expires_in, 86400);
        assert!(!tokens.is_complete());

        let tokens = TokenResponse {
            id_token: "IT1".into(),
            ..tokens
        };
        assert!(tokens.is_complete());
    }
}
