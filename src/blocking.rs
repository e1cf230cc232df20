//! Blocking entry points for synchronous callers
//!
//! Each call builds a private multi-threaded tokio runtime, runs the flow on
//! it and tears it down again, so no async runtime is required by the caller.
//! Do not call these from inside an async context.

use crate::{AuthError, AuthSession, Authenticator, ProfileStore, Result};

/// Blocking version of [`Authenticator::authorize`]
///
/// # Example
///
/// ```no_run
/// use browser_auth::{AuthConfig, Authenticator, blocking};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let authenticator = Authenticator::new(AuthConfig::default());
///     let session = blocking::authorize(&authenticator)?;
///     println!("Expires in {}s", session.tokens.expires_in);
///     Ok(())
/// }
/// ```
pub fn authorize(authenticator: &Authenticator) -> Result<AuthSession> {
    runtime()?.block_on(authenticator.authorize())
}

/// Blocking version of [`Authenticator::authenticate`]
pub fn authenticate<S: ProfileStore>(authenticator: &Authenticator, store: &mut S) -> Result<String> {
    runtime()?.block_on(authenticator.authenticate(store))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|e| AuthError::Runtime(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthConfig;
    use std::time::Duration;

    #[test]
    fn test_blocking_authorize_times_out() {
        let config = AuthConfig::builder()
            .callback_port(0)
            .timeout(Duration::from_millis(50))
            .build();
        let authenticator =
            Authenticator::with_browser(config, |_: &str| -> Result<()> { Ok(()) });

        let err = authorize(&authenticator).unwrap_err();
        assert!(matches!(err, AuthError::Timeout(_)));
    }

    #[test]
    fn test_blocking_authorize_reports_browser_failure() {
        let config = AuthConfig::builder().callback_port(0).build();
        let authenticator = Authenticator::with_browser(config, |_: &str| -> Result<()> {
            Err(AuthError::BrowserLaunch("no display".into()))
        });

        assert!(matches!(
            authorize(&authenticator),
            Err(AuthError::BrowserLaunch(_))
        ));
    }
}
