//! Core identity types and provider traits shared by OAuth2/OIDC strategies.
//!
//! Strategies turn provider-specific responses into a [`NormalizedIdentity`],
//! pruning nil and empty values on the way out so callers never see
//! placeholder data.

mod identity;
mod prune;

pub use identity::{IdentityExtra, IdentityInfo, NormalizedIdentity};
pub use prune::{Prune, pruned};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Profile has neither a subject nor a verified email")]
    MissingUid,

    #[error("Profile request failed: {0}")]
    ProfileFetch(#[source] BoxError),

    #[error("Friends request failed: {0}")]
    FriendsFetch(#[source] BoxError),

    #[error("Invalid authentication payload")]
    InvalidPayload,

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Transport or decoding failure behind a provider request
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Completes authentication from a provider-specific payload.
    async fn verify(&self, auth_payload: serde_json::Value) -> IdentityResult<NormalizedIdentity>;
}
