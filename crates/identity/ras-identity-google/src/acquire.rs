//! Access token acquisition for callback requests.

use crate::client::GoogleClient;
use crate::config::GoogleOAuth2Options;
use crate::error::{AcquisitionError, AcquisitionResult};
use crate::tokeninfo::TokenInfoVerifier;
use crate::types::{AccessToken, CallbackRequest};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Redirect URI Google expects for code exchanges that never left the page
pub const IN_PAGE_REDIRECT_URI: &str = "postmessage";

/// Token acquisition used when no Google-specific path applies.
#[async_trait]
pub trait FallbackAcquisition: Send + Sync {
    async fn acquire(
        &self,
        callback: &CallbackRequest,
        options: &GoogleOAuth2Options,
        client: &GoogleClient,
    ) -> AcquisitionResult<AccessToken>;
}

/// Plain authorization code exchange against the configured redirect URI
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationCodeFallback;

#[async_trait]
impl FallbackAcquisition for AuthorizationCodeFallback {
    async fn acquire(
        &self,
        callback: &CallbackRequest,
        options: &GoogleOAuth2Options,
        client: &GoogleClient,
    ) -> AcquisitionResult<AccessToken> {
        let code = callback
            .param("code")
            .ok_or(AcquisitionError::MissingAuthorizationCode)?;

        client
            .exchange_code(
                &options.client_options.token_endpoint,
                &code_exchange_params(options, code, options.redirect_uri.as_deref()),
            )
            .await
    }
}

/// Form parameters for an authorization code exchange.
///
/// `redirect_uri` is left out when not given. Configured `token_params` are
/// applied last and win over the defaults.
pub fn code_exchange_params(
    options: &GoogleOAuth2Options,
    code: &str,
    redirect_uri: Option<&str>,
) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("grant_type".to_string(), "authorization_code".to_string());
    params.insert("code".to_string(), code.to_string());
    params.insert("client_id".to_string(), options.client_id.clone());
    params.insert("client_secret".to_string(), options.client_secret.clone());
    if let Some(redirect_uri) = redirect_uri {
        params.insert("redirect_uri".to_string(), redirect_uri.to_string());
    }
    params.extend(
        options
            .token_params
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    params
}

/// The ways a callback can yield an access token, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionStrategy {
    /// XHR callback carrying an authorization code
    InPageCodeExchange { code: String },
    /// Full-page callback carrying an authorization code
    CodeExchange { code: String },
    /// Tokens already issued to this client, confirmed via token info
    PreVerifiedTokens,
    Fallback,
}

impl AcquisitionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AcquisitionStrategy::InPageCodeExchange { .. } => "in-page code exchange",
            AcquisitionStrategy::CodeExchange { .. } => "code exchange",
            AcquisitionStrategy::PreVerifiedTokens => "pre-verified tokens",
            AcquisitionStrategy::Fallback => "fallback",
        }
    }
}

/// Picks an acquisition strategy for a callback and runs it.
pub struct TokenAcquisitionRouter<'a> {
    client: &'a GoogleClient,
    options: &'a GoogleOAuth2Options,
    fallback: &'a dyn FallbackAcquisition,
}

impl<'a> TokenAcquisitionRouter<'a> {
    pub fn new(
        client: &'a GoogleClient,
        options: &'a GoogleOAuth2Options,
        fallback: &'a dyn FallbackAcquisition,
    ) -> Self {
        Self {
            client,
            options,
            fallback,
        }
    }

    /// Chooses the first strategy that applies to `callback`.
    ///
    /// Token info is only queried when no code is present.
    pub async fn select(&self, callback: &CallbackRequest) -> AcquisitionStrategy {
        if let Some(code) = callback.param("code") {
            let code = code.to_string();
            return if callback.in_page {
                AcquisitionStrategy::InPageCodeExchange { code }
            } else {
                AcquisitionStrategy::CodeExchange { code }
            };
        }

        let id_token = callback.param("id_token");
        let access_token = callback.param("access_token");
        if id_token.is_some() && access_token.is_some() {
            match TokenInfoVerifier::new(self.client, self.options)
                .verify(id_token, access_token)
                .await
            {
                Ok(()) => return AcquisitionStrategy::PreVerifiedTokens,
                Err(failure) => debug!("Supplied token pair not trusted: {}", failure),
            }
        }

        AcquisitionStrategy::Fallback
    }

    /// Obtains an access token for `callback`. One attempt, no retries.
    pub async fn acquire(&self, callback: &CallbackRequest) -> AcquisitionResult<AccessToken> {
        let strategy = self.select(callback).await;
        info!("Acquiring access token via {}", strategy.name());

        match strategy {
            AcquisitionStrategy::InPageCodeExchange { code }
            | AcquisitionStrategy::CodeExchange { code } => {
                self.client
                    .exchange_code(
                        &self.options.client_options.token_endpoint,
                        &code_exchange_params(self.options, &code, Some(IN_PAGE_REDIRECT_URI)),
                    )
                    .await
            }
            AcquisitionStrategy::PreVerifiedTokens => {
                AccessToken::from_params(&callback.params).ok_or(AcquisitionError::MissingAccessToken)
            }
            AcquisitionStrategy::Fallback => {
                self.fallback
                    .acquire(callback, self.options, self.client)
                    .await
            }
        }
    }
}
