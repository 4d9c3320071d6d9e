//! Google OAuth2 strategy tying the request and callback phases together.

use crate::acquire::{AuthorizationCodeFallback, FallbackAcquisition, TokenAcquisitionRouter};
use crate::authorize::{AuthorizationRequestBuilder, AuthorizeParams};
use crate::client::GoogleClient;
use crate::config::GoogleOAuth2Options;
use crate::error::{AcquisitionError, AcquisitionResult, ConfigError, GoogleOAuth2Result};
use crate::identity::IdentityResolver;
use crate::session::{SessionState, verify_state};
use crate::types::{AccessToken, CallbackRequest};
use async_trait::async_trait;
use ras_identity_core::{IdentityError, IdentityProvider, IdentityResult, NormalizedIdentity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Google OAuth2 strategy
#[derive(Clone)]
pub struct GoogleOAuth2 {
    options: Arc<GoogleOAuth2Options>,
    client: GoogleClient,
    fallback: Arc<dyn FallbackAcquisition>,
}

impl GoogleOAuth2 {
    pub fn new(options: GoogleOAuth2Options) -> Result<Self, ConfigError> {
        options.validate()?;
        let client = GoogleClient::new(options.http_timeout_seconds)?;

        Ok(Self {
            options: Arc::new(options),
            client,
            fallback: Arc::new(AuthorizationCodeFallback),
        })
    }

    /// Replace the acquisition used when neither a code nor a trusted token pair is present
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackAcquisition>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn options(&self) -> &GoogleOAuth2Options {
        &self.options
    }

    /// Request phase: authorization parameters for the redirect to Google.
    ///
    /// The generated `state` is stored in `session`.
    pub fn authorize_params(
        &self,
        redirect_uri: Option<&str>,
        request_params: &HashMap<String, String>,
        session: &mut dyn SessionState,
    ) -> AuthorizeParams {
        let builder = AuthorizationRequestBuilder::new(&self.options);
        builder.build(builder.base_params(redirect_uri), request_params, session)
    }

    /// Request phase: the full authorization redirect URL.
    pub fn authorize_url(
        &self,
        redirect_uri: Option<&str>,
        request_params: &HashMap<String, String>,
        session: &mut dyn SessionState,
    ) -> Result<String, ConfigError> {
        let params = self.authorize_params(redirect_uri, request_params, session);
        let url = AuthorizationRequestBuilder::new(&self.options).url(&params)?;

        info!("Redirecting to Google authorization endpoint");
        Ok(url)
    }

    pub async fn acquire_token(&self, callback: &CallbackRequest) -> AcquisitionResult<AccessToken> {
        TokenAcquisitionRouter::new(&self.client, &self.options, self.fallback.as_ref())
            .acquire(callback)
            .await
    }

    /// A fresh resolver for one access token.
    pub fn resolver<'a>(&'a self, access_token: &'a AccessToken) -> IdentityResolver<'a> {
        IdentityResolver::new(&self.client, &self.options, access_token)
    }

    pub async fn resolve_identity(
        &self,
        access_token: &AccessToken,
    ) -> IdentityResult<NormalizedIdentity> {
        self.resolver(access_token).resolve().await
    }

    /// Callback phase: provider error check, CSRF check, token acquisition and identity resolution.
    pub async fn callback_phase(
        &self,
        callback: &CallbackRequest,
        session: &mut dyn SessionState,
    ) -> GoogleOAuth2Result<NormalizedIdentity> {
        check_provider_error(callback)?;

        if !self.options.provider_ignores_state {
            verify_state(session, callback.param("state"))?;
        }

        let access_token = self.acquire_token(callback).await?;
        Ok(self.resolve_identity(&access_token).await?)
    }
}

fn check_provider_error(callback: &CallbackRequest) -> AcquisitionResult<()> {
    let Some(error) = callback
        .param("error_reason")
        .or_else(|| callback.param("error"))
    else {
        return Ok(());
    };

    warn!("Google returned an authorization error: {}", error);
    let message = match callback.param("error_description") {
        Some(description) => format!("{error}: {description}"),
        None => error.to_string(),
    };
    Err(AcquisitionError::CallbackError(message))
}

#[async_trait]
impl IdentityProvider for GoogleOAuth2 {
    fn provider_id(&self) -> &str {
        &self.options.name
    }

    /// Completes authentication from a serialized [`CallbackRequest`].
    ///
    /// No session is available here, so the `state` check is skipped.
    async fn verify(&self, auth_payload: serde_json::Value) -> IdentityResult<NormalizedIdentity> {
        let callback: CallbackRequest =
            serde_json::from_value(auth_payload).map_err(|_| IdentityError::InvalidPayload)?;

        check_provider_error(&callback).map_err(|e| IdentityError::ProviderError(e.to_string()))?;

        let access_token = self
            .acquire_token(&callback)
            .await
            .map_err(|e| IdentityError::ProviderError(e.to_string()))?;

        self.resolve_identity(&access_token).await
    }
}
