//! Authorization request construction.

use crate::config::GoogleOAuth2Options;
use crate::error::ConfigError;
use crate::session::{STATE_SESSION_KEY, SessionState};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Outbound authorization parameters, in serialization order
pub type AuthorizeParams = BTreeMap<String, String>;

/// Builds Google authorization requests from generic and provider-specific parameters.
pub struct AuthorizationRequestBuilder<'a> {
    options: &'a GoogleOAuth2Options,
}

impl<'a> AuthorizationRequestBuilder<'a> {
    pub fn new(options: &'a GoogleOAuth2Options) -> Self {
        Self { options }
    }

    /// Parameters every OAuth2 authorization request starts from.
    ///
    /// A fresh random `state` is generated for CSRF protection.
    pub fn base_params(&self, redirect_uri: Option<&str>) -> AuthorizeParams {
        let mut params = AuthorizeParams::new();
        params.insert("response_type".to_string(), "code".to_string());
        params.insert("client_id".to_string(), self.options.client_id.clone());
        if let Some(redirect_uri) = redirect_uri.or(self.options.redirect_uri.as_deref()) {
            params.insert("redirect_uri".to_string(), redirect_uri.to_string());
        }
        params.insert("state".to_string(), Uuid::new_v4().to_string());
        params
    }

    /// Applies Google's conventions on top of `params`.
    ///
    /// Non-empty values for the configured passthrough keys are copied from
    /// the pre-redirect request, scopes are expanded, `access_type` defaults to
    /// `offline`, `openid_realm` becomes `openid.realm`, and the final `state`
    /// is remembered in the session.
    pub fn build(
        &self,
        mut params: AuthorizeParams,
        request_params: &HashMap<String, String>,
        session: &mut dyn SessionState,
    ) -> AuthorizeParams {
        for key in &self.options.passthrough_authorize_keys {
            if let Some(value) = request_params.get(key).filter(|v| !v.is_empty()) {
                params.insert(key.clone(), value.clone());
            }
        }

        let raw_scope = params
            .get("scope")
            .cloned()
            .unwrap_or_else(|| self.options.default_scope.clone());
        params.insert("scope".to_string(), self.normalize_scope(&raw_scope));

        params
            .entry("access_type".to_string())
            .or_insert_with(|| "offline".to_string());

        if let Some(realm) = params.remove("openid_realm") {
            params.insert("openid.realm".to_string(), realm);
        }

        if let Some(state) = params.get("state") {
            session.store(STATE_SESSION_KEY, state.clone());
        }

        debug!("Built authorization params with scope: {}", params["scope"]);
        params
    }

    /// Splits a scope string on whitespace and commas and expands short names.
    ///
    /// Absolute URLs and base scopes are kept as-is; everything else gets the
    /// configured scope prefix.
    pub fn normalize_scope(&self, raw_scope: &str) -> String {
        raw_scope
            .split_whitespace()
            .flat_map(|item| item.split(','))
            .filter(|scope| !scope.is_empty())
            .map(|scope| {
                if scope.starts_with("http://")
                    || scope.starts_with("https://")
                    || self.options.base_scopes.contains(scope)
                {
                    scope.to_string()
                } else {
                    format!("{}{}", self.options.base_scope_prefix, scope)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serializes `params` onto the authorization endpoint.
    pub fn url(&self, params: &AuthorizeParams) -> Result<String, ConfigError> {
        let mut url = Url::parse(&self.options.client_options.authorize_endpoint)?;
        url.query_pairs_mut().extend_pairs(params.iter());
        Ok(url.to_string())
    }
}
