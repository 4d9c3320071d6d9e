//! Google OAuth2 strategy configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use url::Url;

pub const DEFAULT_NAME: &str = "google_oauth2";

/// Prefix turning a short scope name into a full Google scope URL
pub const BASE_SCOPE_URL: &str = "https://www.googleapis.com/auth/";

/// Scopes Google accepts without the URL prefix
pub const BASE_SCOPES: [&str; 3] = ["profile", "email", "openid"];

pub const DEFAULT_SCOPE: &str = "email,profile";

/// Query parameters copied from the pre-redirect request into the authorization request
pub const AUTHORIZE_OPTIONS: [&str; 10] = [
    "access_type",
    "hd",
    "login_hint",
    "prompt",
    "request_visible_actions",
    "scope",
    "state",
    "redirect_uri",
    "include_granted_scopes",
    "openid_realm",
];

/// Environment variable prefix read by [`GoogleOAuth2Options::load`]
pub const ENV_PREFIX: &str = "GOOGLE_OAUTH2";

/// Provider endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub profile_endpoint: String,
    /// Template with a `{uid}` placeholder
    pub friends_endpoint: String,
    pub token_info_endpoint: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            authorize_endpoint: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_endpoint: "https://accounts.google.com/o/oauth2/token".to_string(),
            profile_endpoint: "https://www.googleapis.com/plus/v1/people/me/openIdConnect"
                .to_string(),
            friends_endpoint: "https://www.googleapis.com/plus/v1/people/{uid}/people/visible"
                .to_string(),
            token_info_endpoint: "https://www.googleapis.com/oauth2/v2/tokeninfo".to_string(),
        }
    }
}

impl ClientOptions {
    /// Friends endpoint for a given subject.
    pub fn friends_url(&self, uid: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(uid.as_bytes()).collect();
        self.friends_endpoint.replace("{uid}", &encoded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for endpoint in [
            &self.authorize_endpoint,
            &self.token_endpoint,
            &self.profile_endpoint,
            &self.friends_endpoint,
            &self.token_info_endpoint,
        ] {
            Url::parse(endpoint)?;
        }
        Ok(())
    }
}

/// Requested profile image size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSize {
    /// Longest edge in pixels
    Pixels(u32),
    Dimensions {
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAspect {
    #[default]
    #[serde(rename = "none")]
    Original,
    Square,
}

/// Options for the Google OAuth2 strategy.
///
/// Read-only once the strategy is built; every request shares the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleOAuth2Options {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with Google
    pub redirect_uri: Option<String>,
    pub client_options: ClientOptions,
    pub default_scope: String,
    pub base_scope_prefix: String,
    pub base_scopes: BTreeSet<String>,
    pub passthrough_authorize_keys: Vec<String>,
    /// Extra parameters sent with every code exchange
    pub token_params: BTreeMap<String, String>,
    pub skip_friend_lookup: bool,
    pub skip_raw_info: bool,
    pub image_size: Option<ImageSize>,
    pub image_aspect: ImageAspect,
    pub provider_ignores_state: bool,
    pub id_token_leeway_seconds: u64,
    pub http_timeout_seconds: u64,
}

impl Default for GoogleOAuth2Options {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: None,
            client_options: ClientOptions::default(),
            default_scope: DEFAULT_SCOPE.to_string(),
            base_scope_prefix: BASE_SCOPE_URL.to_string(),
            base_scopes: BASE_SCOPES.iter().map(|s| s.to_string()).collect(),
            passthrough_authorize_keys: AUTHORIZE_OPTIONS.iter().map(|s| s.to_string()).collect(),
            token_params: BTreeMap::new(),
            skip_friend_lookup: true,
            skip_raw_info: false,
            image_size: None,
            image_aspect: ImageAspect::Original,
            provider_ignores_state: false,
            id_token_leeway_seconds: 0,
            http_timeout_seconds: 30,
        }
    }
}

impl GoogleOAuth2Options {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Loads options from an optional TOML file, then `GOOGLE_OAUTH2_*` environment variables.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `GOOGLE_OAUTH2_CLIENT_OPTIONS__TOKEN_ENDPOINT`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_from(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let options: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::MissingClientSecret);
        }
        self.client_options.validate()
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_client_options(mut self, client_options: ClientOptions) -> Self {
        self.client_options = client_options;
        self
    }

    pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scope = scope.into();
        self
    }

    pub fn with_token_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token_params.insert(key.into(), value.into());
        self
    }

    pub fn with_friend_lookup(mut self, enabled: bool) -> Self {
        self.skip_friend_lookup = !enabled;
        self
    }

    pub fn with_skip_raw_info(mut self, skip: bool) -> Self {
        self.skip_raw_info = skip;
        self
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = Some(size);
        self
    }

    pub fn with_image_aspect(mut self, aspect: ImageAspect) -> Self {
        self.image_aspect = aspect;
        self
    }

    pub fn with_provider_ignores_state(mut self, ignores: bool) -> Self {
        self.provider_ignores_state = ignores;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}
