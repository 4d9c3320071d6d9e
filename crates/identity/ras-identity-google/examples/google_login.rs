//! Example showing the Google OAuth2 strategy end to end
//!
//! This example demonstrates:
//! 1. Loading options from an optional TOML file and `GOOGLE_OAUTH2_*` variables
//! 2. Building the authorization redirect URL
//! 3. Completing the callback with a code pasted from the browser
//!
//! ```sh
//! GOOGLE_OAUTH2_CLIENT_ID=... GOOGLE_OAUTH2_CLIENT_SECRET=... \
//!     cargo run --example google_login -- google.toml
//! ```

use ras_identity_google::{CallbackRequest, GoogleOAuth2, GoogleOAuth2Options};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let options = GoogleOAuth2Options::load(config_path.as_deref())?
        .with_default_scope("openid email profile");
    let strategy = GoogleOAuth2::new(options)?;

    // Stands in for the web framework's session
    let mut session: HashMap<String, String> = HashMap::new();

    let request_params = HashMap::from([("prompt".to_string(), "select_account".to_string())]);
    let auth_url = strategy.authorize_url(None, &request_params, &mut session)?;

    println!("1. Open this URL in your browser:\n\n   {auth_url}\n");
    println!("2. Paste the query string Google redirected back with (code=...&state=...):");

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let query = line.trim().trim_start_matches('?');
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    let identity = strategy
        .callback_phase(&CallbackRequest::new(params), &mut session)
        .await?;

    println!("\nSigned in as {}", identity.uid);
    println!("{}", serde_json::to_string_pretty(&identity)?);

    Ok(())
}
