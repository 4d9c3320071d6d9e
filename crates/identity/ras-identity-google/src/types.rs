//! Google OAuth2 protocol types.

use chrono::{Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Value of `X-Requested-With` sent by in-page (XHR) requests
pub const XHR_REQUESTED_WITH: &str = "XMLHttpRequest";

/// Inbound parameters of the callback request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// Set when the callback was made without a full page navigation
    #[serde(default)]
    pub in_page: bool,
}

impl CallbackRequest {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self {
            params,
            in_page: false,
        }
    }

    pub fn in_page(mut self, in_page: bool) -> Self {
        self.in_page = in_page;
        self
    }

    /// Marks the request in-page when `X-Requested-With` names an XHR.
    pub fn with_requested_with(self, header: Option<&str>) -> Self {
        let in_page = header.is_some_and(|value| value.eq_ignore_ascii_case(XHR_REQUESTED_WITH));
        self.in_page(in_page)
    }

    /// Returns a parameter only when it is present and non-empty.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// OAuth2 token response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Unix timestamp derived from `expires_in` when the token was received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            id_token: None,
            refresh_token: None,
            expires_in: None,
            expires_at: None,
            scope: None,
            extra: HashMap::new(),
        }
    }

    /// Builds a token straight from callback parameters.
    ///
    /// Returns `None` when no access token was supplied.
    pub fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        let access_token = params.get("access_token").filter(|v| !v.is_empty())?;
        let mut token = Self::new(access_token.clone());

        for (key, value) in params {
            match key.as_str() {
                "access_token" => {}
                "token_type" => token.token_type = Some(value.clone()),
                "id_token" => token.id_token = Some(value.clone()),
                "refresh_token" => token.refresh_token = Some(value.clone()),
                "scope" => token.scope = Some(value.clone()),
                "expires_in" => token.expires_in = value.parse().ok(),
                "expires_at" => token.expires_at = value.parse().ok(),
                _ => {
                    token
                        .extra
                        .insert(key.clone(), serde_json::Value::String(value.clone()));
                }
            }
        }

        Some(token.stamped())
    }

    /// Fills `expires_at` from `expires_in` if the provider did not send one.
    pub fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            if let Some(expires_in) = self.expires_in {
                let expires_at = Utc::now() + Duration::seconds(expires_in as i64);
                self.expires_at = Some(expires_at.timestamp());
            }
        }
        self
    }
}

/// Profile payload returned by Google's OpenID Connect profile endpoint.
///
/// Known fields are typed; everything else lands in `additional_claims`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Subject under the legacy profile APIs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "bool_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Hosted domain of a Workspace account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd: Option<String>,
    #[serde(flatten)]
    pub additional_claims: HashMap<String, serde_json::Value>,
}

impl RawIdentity {
    /// Non-empty `sub`, else non-empty `id`.
    pub fn subject(&self) -> Option<&str> {
        [self.sub.as_deref(), self.id.as_deref()]
            .into_iter()
            .flatten()
            .find(|subject| !subject.is_empty())
    }

    /// The email address, but only once Google has verified it.
    pub fn verified_email(&self) -> Option<&str> {
        match self.email_verified {
            Some(true) => self.email.as_deref().filter(|email| !email.is_empty()),
            _ => None,
        }
    }
}

/// Google's profile endpoints have sent `email_verified` both as a JSON bool
/// and as the strings "true"/"false".
fn bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(flag)) => Some(flag),
        Some(Flag::Text(text)) => match text.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        None => None,
    })
}

/// Token introspection response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenInfoResponse {
    #[serde(default)]
    pub issued_to: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}
