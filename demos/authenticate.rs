//! Browser login that stores the session token in a config file
//!
//! Opens the identity provider in the default browser, waits for the redirect
//! on the local callback listener and writes the session token into the
//! default profile of the given TOML config file.
//!
//! Required features: `browser` (default)
//!
//! Run with: cargo run --example authenticate -- path/to/config.toml

use browser_auth::{AuthConfig, Authenticator, ConfigFile};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("browser_auth=info".parse()?))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let mut config = ConfigFile::load(&path)?;

    println!("=== Browser Login ===\n");
    println!("Starting localhost server to handle the authentication flow.");
    println!("Your default browser will open so you can sign in.\n");

    let authenticator = Authenticator::new(AuthConfig::default());
    match authenticator.authenticate(&mut config).await {
        Ok(_) => {
            println!("✅ Session token persisted to {}", config.path().display());
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("{}", e.remediation());
            std::process::exit(1);
        }
    }
}
