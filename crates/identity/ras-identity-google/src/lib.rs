//! Google OAuth2 / OpenID Connect identity strategy.
//!
//! The request phase builds Google's authorization redirect, expanding short
//! scope names and remembering the CSRF `state` in the caller's session. The
//! callback phase picks a way to obtain an access token (code exchange, in-page
//! code exchange, caller-supplied tokens confirmed through Google's token info
//! endpoint, or a pluggable fallback) and resolves it into a pruned
//! [`NormalizedIdentity`].
//!
//! ```no_run
//! use ras_identity_google::{CallbackRequest, GoogleOAuth2, GoogleOAuth2Options};
//! use std::collections::HashMap;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let strategy = GoogleOAuth2::new(
//!     GoogleOAuth2Options::new("client_id", "client_secret")
//!         .with_redirect_uri("http://localhost:3000/auth/google/callback"),
//! )?;
//!
//! let mut session: HashMap<String, String> = HashMap::new();
//! let url = strategy.authorize_url(None, &HashMap::new(), &mut session)?;
//! println!("Visit {url}");
//!
//! // Later, with the query parameters Google redirected back with
//! let callback = CallbackRequest::new(HashMap::new());
//! let identity = strategy.callback_phase(&callback, &mut session).await?;
//! println!("Signed in as {}", identity.uid);
//! # Ok(())
//! # }
//! ```

mod acquire;
mod authorize;
mod claims;
mod client;
mod config;
mod error;
mod identity;
mod image;
mod session;
mod strategy;
mod tokeninfo;
mod types;


pub use acquire::{
    AcquisitionStrategy, AuthorizationCodeFallback, FallbackAcquisition, IN_PAGE_REDIRECT_URI,
    TokenAcquisitionRouter, code_exchange_params,
};
pub use authorize::{AuthorizationRequestBuilder, AuthorizeParams};
pub use claims::{ClaimVerifier, DecodedClaims, GOOGLE_ISSUERS};
pub use client::GoogleClient;
pub use crate::config::{
    AUTHORIZE_OPTIONS, BASE_SCOPE_URL, BASE_SCOPES, ClientOptions, DEFAULT_NAME, DEFAULT_SCOPE,
    GoogleOAuth2Options, ImageAspect, ImageSize,
};
pub use error::{
    AcquisitionError, AcquisitionResult, ApiError, ClaimError, ConfigError, GoogleOAuth2Error,
    GoogleOAuth2Result, VerificationFailure,
};
pub use identity::{IdentityResolver, PROFILE_URL_KEY};
pub use image::ImageUrlBuilder;
pub use session::{STATE_SESSION_KEY, SessionState, verify_state};
pub use strategy::GoogleOAuth2;
pub use tokeninfo::TokenInfoVerifier;
pub use types::{AccessToken, CallbackRequest, RawIdentity, TokenInfoResponse, XHR_REQUESTED_WITH};

// Re-export common types for convenience
pub use ras_identity_core::{
    IdentityError, IdentityExtra, IdentityInfo, IdentityProvider, IdentityResult,
    NormalizedIdentity,
};
