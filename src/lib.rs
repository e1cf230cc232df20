//! # browser-auth
//!
//! Browser-based OAuth 2.0 login with PKCE for command-line tools.
//!
//! The user signs in with the identity provider in their default browser. A
//! listener on a local port receives the redirect, exchanges the
//! authorization code for tokens, verifies both tokens against the
//! provider's published key set and hands the session token carried in the
//! ID token back to the waiting command. No client secret is involved.
//!
//! ## Features
//!
//! - **PKCE Support**: S256 code challenge, fresh verifier per attempt
//! - **Local Callback Server**: single-shot `GET /callback` listener, shut
//!   down once the result is consumed
//! - **JWKS Verification**: access and ID tokens verified before use
//! - **Profile Storage**: session token written to the default profile of a
//!   TOML config file, or any [`ProfileStore`]
//! - **Browser Integration**: auto-open the authorization URL (default)
//! - **Blocking API** (optional): run the flow without an async runtime
//!
//! ## Quick Start
//!
//! ```no_run
//! use browser_auth::{AuthConfig, Authenticator, ConfigFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authenticator = Authenticator::new(AuthConfig::default());
//!     let mut config = ConfigFile::load("config.toml")?;
//!
//!     match authenticator.authenticate(&mut config).await {
//!         Ok(_) => println!("Authenticated."),
//!         Err(e) => eprintln!("{}\n{}", e, e.remediation()),
//!     }
//!     Ok(())
//! }
//! ```

mod browser;
mod client;
mod error;
mod flow;
mod jwt;
mod pkce;
mod profile;
mod server;
mod types;

#[cfg(feature = "blocking")]
pub mod blocking;

// Public API exports
pub use browser::BrowserLauncher;
pub use client::AuthClient;
pub use error::{
    AUTH_REMEDIATION, AuthError, PROFILE_REMEDIATION, PROFILE_UPDATE_REMEDIATION, Result,
    TokenKind,
};
pub use flow::Authenticator;
pub use jwt::{Claims, extract_session_token, verify_signature};
pub use pkce::Verifier;
pub use profile::{ConfigFile, Profile, ProfileStore};
pub use server::{CallbackServer, Delivery, PendingResult, ResultSlot};
pub use types::{
    AuthConfig, AuthConfigBuilder, AuthSession, CALLBACK_PATH, FlowResult, TokenResponse,
};

#[cfg(feature = "browser")]
pub use browser::{SystemBrowser, open_browser};
