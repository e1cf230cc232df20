use crate::{AuthError, Result};

/// Opens the authorization URL for the user
///
/// The flow treats a launch failure as fatal. Closures taking the URL are
/// launchers too, which is how tests drive the callback without a browser.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

impl<F> BrowserLauncher for F
where
    F: Fn(&str) -> Result<()> + Send + Sync,
{
    fn open(&self, url: &str) -> Result<()> {
        self(url)
    }
}

/// Launcher backed by the user's default web browser
#[cfg(feature = "browser")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

#[cfg(feature = "browser")]
impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        open_browser(url)
    }
}

/// Open a URL in the user's default web browser
///
/// # Errors
///
/// Returns [`AuthError::BrowserLaunch`] if the browser cannot be launched
///
/// # Example
///
/// ```no_run
/// use browser_auth::{AuthClient, AuthConfig, Verifier, open_browser};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AuthClient::new(AuthConfig::default())?;
/// let verifier = Verifier::generate()?;
///
/// open_browser(&client.authorization_url(&verifier)?)?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "browser")]
pub fn open_browser(url: &str) -> Result<()> {
    webbrowser::open(url).map_err(|e| AuthError::BrowserLaunch(e.to_string()))
}
