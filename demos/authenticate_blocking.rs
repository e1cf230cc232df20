//! Browser login from synchronous code
//!
//! Same flow as `authenticate`, driven through the blocking API and with a
//! shorter deadline for the browser step.
//!
//! Required features: `browser`, `blocking` (or use `full`)
//!
//! Run with: cargo run --example authenticate_blocking --features full

use std::time::Duration;

use browser_auth::{AuthConfig, Authenticator, blocking};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AuthConfig::builder()
        .timeout(Duration::from_secs(120))
        .build();
    let authenticator = Authenticator::new(config);

    println!("🌐 Waiting up to two minutes for the browser login...");
    let session = blocking::authorize(&authenticator)?;

    println!("\n✅ Success!");
    println!("Token type: {}", session.tokens.token_type);
    println!("Expires in: {}s", session.tokens.expires_in);
    println!(
        "Session token: {}...",
        session.session_token.chars().take(8).collect::<String>()
    );

    Ok(())
}
