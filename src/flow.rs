use tracing::{debug, info};

use crate::browser::BrowserLauncher;
use crate::profile::ProfileStore;
use crate::server::CallbackServer;
use crate::{AuthClient, AuthConfig, AuthError, AuthSession, Result, Verifier};

/// Drives the browser login from start to finish
///
/// One call to [`Authenticator::authorize`] is one authorization attempt: a
/// fresh PKCE verifier, a callback listener, the browser launch, and a wait
/// for exactly one result.
///
/// # Example
///
/// ```no_run
/// use browser_auth::{AuthConfig, Authenticator, ConfigFile};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let authenticator = Authenticator::new(AuthConfig::default());
/// let mut config = ConfigFile::load("config.toml")?;
///
/// authenticator.authenticate(&mut config).await?;
/// println!("Session token saved to {}", config.path().display());
/// # Ok(())
/// # }
/// ```
pub struct Authenticator {
    config: AuthConfig,
    browser: Box<dyn BrowserLauncher>,
}

impl Authenticator {
    /// Create an authenticator that opens the system's default browser
    #[cfg(feature = "browser")]
    pub fn new(config: AuthConfig) -> Self {
        Self::with_browser(config, crate::browser::SystemBrowser)
    }

    /// Create an authenticator with a custom browser launcher
    pub fn with_browser(config: AuthConfig, browser: impl BrowserLauncher + 'static) -> Self {
        Self {
            config,
            browser: Box::new(browser),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Run one authorization attempt and return the verified session
    ///
    /// Blocks until the callback delivers its result or the configured
    /// timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage: verifier generation, listener
    /// bind, browser launch, or the terminal error delivered by the callback
    pub async fn authorize(&self) -> Result<AuthSession> {
        let verifier = Verifier::generate()?;

        let server = CallbackServer::bind(&self.config).await?;
        let client = AuthClient::new(server.config().clone())?;
        let authorization_url = client.authorization_url(&verifier)?;
        let pending = server.serve(client, verifier);

        info!(url = %authorization_url, "opening the authorization URL in the default browser");
        self.browser.open(&authorization_url)?;

        pending.wait(self.config.timeout).await
    }

    /// Authorize and store the session token in the default profile
    ///
    /// The store is only modified once the whole flow has succeeded.
    ///
    /// # Errors
    ///
    /// Authorization failures are wrapped in [`AuthError::Authorize`].
    /// [`AuthError::NoDefaultProfile`], [`AuthError::ProfileUpdate`] and
    /// [`AuthError::ConfigPersist`] report the profile update.
    pub async fn authenticate<S: ProfileStore>(&self, store: &mut S) -> Result<String> {
        let session = self
            .authorize()
            .await
            .map_err(|e| AuthError::Authorize(Box::new(e)))?;

        store_session(store, &session)?;
        Ok(session.session_token)
    }
}

pub(crate) fn store_session<S: ProfileStore>(store: &mut S, session: &AuthSession) -> Result<()> {
    let profile = store.default_profile().ok_or(AuthError::NoDefaultProfile)?;

    if !store.set_token(&profile, &session.session_token) {
        return Err(AuthError::ProfileUpdate);
    }
    store.persist()?;

    debug!(profile = %profile, "session token stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenResponse;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        default: Option<String>,
        tokens: HashMap<String, String>,
        fail_persist: bool,
    }

    impl ProfileStore for MemoryStore {
        fn default_profile(&self) -> Option<String> {
            self.default.clone()
        }

        fn set_token(&mut self, profile: &str, token: &str) -> bool {
            match self.tokens.get_mut(profile) {
                Some(t) => {
                    *t = token.to_string();
                    true
                }
                None => false,
            }
        }

        fn persist(&self) -> Result<()> {
            if self.fail_persist {
                return Err(AuthError::ConfigPersist("read-only file system".into()));
            }
            Ok(())
        }
    }

    fn session() -> AuthSession {
        AuthSession {
            tokens: TokenResponse::default(),
            session_token: "SESSION-XYZ".to_string(),
        }
    }

    #[test]
    fn test_store_session_updates_default_profile() {
        let mut store = MemoryStore {
            default: Some("user".into()),
            tokens: HashMap::from([("user".to_string(), "old".to_string())]),
            ..Default::default()
        };

        store_session(&mut store, &session()).unwrap();
        assert_eq!(store.tokens["user"], "SESSION-XYZ");
    }

    #[test]
    fn test_store_session_without_default_profile() {
        let mut store = MemoryStore::default();
        let err = store_session(&mut store, &session()).unwrap_err();
        assert!(matches!(err, AuthError::NoDefaultProfile));
        assert_eq!(err.remediation(), crate::error::PROFILE_REMEDIATION);
    }

    #[test]
    fn test_store_session_profile_vanished() {
        let mut store = MemoryStore {
            default: Some("user".into()),
            ..Default::default()
        };
        let err = store_session(&mut store, &session()).unwrap_err();
        assert!(matches!(err, AuthError::ProfileUpdate));
    }

    #[test]
    fn test_store_session_persist_failure() {
        let mut store = MemoryStore {
            default: Some("user".into()),
            tokens: HashMap::from([("user".to_string(), "old".to_string())]),
            fail_persist: true,
        };
        let err = store_session(&mut store, &session()).unwrap_err();
        assert!(matches!(err, AuthError::ConfigPersist(_)));
    }

    #[tokio::test]
    async fn test_browser_failure_is_fatal() {
        let config = AuthConfig::builder().callback_port(0).build();
        let authenticator = Authenticator::with_browser(config, |_: &str| -> Result<()> {
            Err(AuthError::BrowserLaunch("no display".into()))
        });

        let err = authenticator.authorize().await.unwrap_err();
        assert!(matches!(err, AuthError::BrowserLaunch(_)));
    }

    #[tokio::test]
    async fn test_failed_authorization_leaves_store_untouched() {
        let config = AuthConfig::builder()
            .callback_port(0)
            .timeout(std::time::Duration::from_millis(50))
            .build();
        let authenticator = Authenticator::with_browser(config, |_: &str| -> Result<()> { Ok(()) });
        let mut store = MemoryStore {
            default: Some("user".into()),
            tokens: HashMap::from([("user".to_string(), "old".to_string())]),
            ..Default::default()
        };

        let err = authenticator.authenticate(&mut store).await.unwrap_err();
        assert!(matches!(err, AuthError::Authorize(ref inner) if matches!(**inner, AuthError::Timeout(_))));
        assert_eq!(store.tokens["user"], "old");
    }
}
