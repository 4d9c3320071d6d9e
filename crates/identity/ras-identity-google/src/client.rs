//! HTTP calls against Google's OAuth2 and profile endpoints.

use crate::error::{AcquisitionError, AcquisitionResult, ApiError, ConfigError, VerificationFailure};
use crate::types::{AccessToken, TokenInfoResponse};
use ras_identity_core::{IdentityError, IdentityResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

/// Thin wrapper around a pooled `reqwest` client with a request timeout
#[derive(Clone)]
pub struct GoogleClient {
    http_client: Client,
}

impl GoogleClient {
    pub fn new(http_timeout_seconds: u64) -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .build()?;

        Ok(Self { http_client })
    }

    /// Exchange an authorization code at the token endpoint
    pub async fn exchange_code(
        &self,
        token_endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> AcquisitionResult<AccessToken> {
        let response = self
            .http_client
            .post(token_endpoint)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Token exchange failed: {}", error_text);
            return Err(AcquisitionError::TokenExchangeFailed(error_text));
        }

        let token: AccessToken = response
            .json()
            .await
            .map_err(|e| AcquisitionError::InvalidTokenResponse(e.to_string()))?;

        info!("Successfully exchanged code for tokens");
        Ok(token.stamped())
    }

    /// Query the token introspection endpoint for an identity/access token pair
    pub async fn token_info(
        &self,
        token_info_endpoint: &str,
        id_token: &str,
        access_token: &str,
    ) -> Result<TokenInfoResponse, VerificationFailure> {
        let response = self
            .http_client
            .get(token_info_endpoint)
            .query(&[("id_token", id_token), ("access_token", access_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VerificationFailure::Rejected(response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| VerificationFailure::InvalidResponse(e.to_string()))
    }

    /// Get the profile of the token's owner, exactly as Google sent it
    pub async fn fetch_profile(
        &self,
        profile_endpoint: &str,
        access_token: &str,
    ) -> IdentityResult<serde_json::Value> {
        let payload = self
            .get_authorized(profile_endpoint, access_token)
            .await
            .map_err(|e| IdentityError::ProfileFetch(e.into()))?;

        debug!("Retrieved profile from {}", profile_endpoint);
        Ok(payload)
    }

    /// Get the people visible to the token's owner
    pub async fn fetch_friends(
        &self,
        friends_url: &str,
        access_token: &str,
    ) -> IdentityResult<serde_json::Value> {
        self.get_authorized(friends_url, access_token)
            .await
            .map_err(|e| IdentityError::FriendsFetch(e.into()))
    }

    async fn get_authorized<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Request to {} failed with {}: {}", url, status, body);
            return Err(ApiError::Rejected { status, body });
        }

        Ok(response.json().await?)
    }
}
