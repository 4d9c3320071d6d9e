//! Normalized identity produced by a strategy's callback phase.

use crate::prune::Prune;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Profile fields every strategy maps its provider payload onto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Profile links keyed by site name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profile_urls: BTreeMap<String, Option<String>>,
}

impl Prune for IdentityInfo {
    fn prune(&mut self) {
        self.name.prune();
        self.email.prune();
        self.first_name.prune();
        self.last_name.prune();
        self.image_url.prune();
        self.profile_urls.prune();
    }

    fn is_blank(&self) -> bool {
        self.name.is_blank()
            && self.email.is_blank()
            && self.first_name.is_blank()
            && self.last_name.is_blank()
            && self.image_url.is_blank()
            && self.profile_urls.is_blank()
    }
}

/// Supplementary provider data kept alongside the profile fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityExtra {
    /// The raw identity token as issued by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
    /// Identity token body, present only when its claims checked out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_claims: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_identity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_friends: Option<Value>,
}

impl Prune for IdentityExtra {
    fn prune(&mut self) {
        self.identity_token.prune();
        self.decoded_claims.prune();
        self.raw_identity.prune();
        self.raw_friends.prune();
    }

    fn is_blank(&self) -> bool {
        self.identity_token.is_blank()
            && self.decoded_claims.is_blank()
            && self.raw_identity.is_blank()
            && self.raw_friends.is_blank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIdentity {
    pub provider_id: String,
    /// Stable identifier of the subject, never empty
    pub uid: String,
    #[serde(default)]
    pub info: IdentityInfo,
    #[serde(default)]
    pub extra: IdentityExtra,
}

impl NormalizedIdentity {
    /// Builds an identity with `info` and `extra` already pruned.
    pub fn new(
        provider_id: impl Into<String>,
        uid: impl Into<String>,
        mut info: IdentityInfo,
        mut extra: IdentityExtra,
    ) -> Self {
        info.prune();
        extra.prune();

        Self {
            provider_id: provider_id.into(),
            uid: uid.into(),
            info,
            extra,
        }
    }
}
