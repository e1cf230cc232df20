use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Generic remediation for a failed authorization attempt.
pub const AUTH_REMEDIATION: &str = "Please re-run the command. If the problem persists, please file an issue with the CLI maintainers.";

/// Remediation when no default profile exists to receive the session token.
pub const PROFILE_REMEDIATION: &str = "Create a profile and mark it as the default, then re-run the command.";

/// Remediation when the default profile could not be updated in place.
pub const PROFILE_UPDATE_REMEDIATION: &str =
    "Update your default profile manually and paste in the session token.";

/// Which of the two provider tokens a verification error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Id,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access token"),
            TokenKind::Id => f.write_str("ID token"),
        }
    }
}

/// Error types for the browser authentication flow
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("failed to generate a code verifier: {0}")]
    Entropy(String),

    #[error("failed to start local server: {0}")]
    ListenerBind(String),

    #[error("failed to open your default browser: {0}")]
    BrowserLaunch(String),

    #[error("no authorization code returned")]
    MissingAuthorizationCode,

    #[error("invalid authorization code")]
    InvalidAuthorizationCode,

    #[error("failed to exchange code for JWT")]
    TokenExchange {
        #[source]
        source: Option<Box<AuthError>>,
    },

    #[error("failed to verify signature of {kind}: {reason}")]
    SignatureVerification { kind: TokenKind, reason: String },

    #[error("failed to extract session token from JWT custom claim")]
    ClaimExtraction,

    #[error("failed to authorize: {0}")]
    Authorize(#[source] Box<AuthError>),

    #[error("no profiles available")]
    NoDefaultProfile,

    #[error("failed to update default profile with new session token")]
    ProfileUpdate,

    #[error("error saving config file: {0}")]
    ConfigPersist(String),

    #[error("error reading config file: {0}")]
    ConfigLoad(String),

    #[error("timed out after {0:?} waiting for the browser to complete authorization")]
    Timeout(Duration),

    #[error("callback server error: {0}")]
    CallbackServer(String),

    #[error("failed to start async runtime: {0}")]
    Runtime(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {status}: {body}")]
    Http { status: u16, body: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid JWT token: {0}")]
    InvalidJwt(String),

    #[error("JWT decode error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// Human-readable next step to print alongside the error
    pub fn remediation(&self) -> &'static str {
        match self {
            AuthError::NoDefaultProfile => PROFILE_REMEDIATION,
            AuthError::ProfileUpdate => PROFILE_UPDATE_REMEDIATION,
            AuthError::Authorize(inner) => inner.remediation(),
            _ => AUTH_REMEDIATION,
        }
    }

    pub(crate) fn token_exchange(source: AuthError) -> Self {
        AuthError::TokenExchange {
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
