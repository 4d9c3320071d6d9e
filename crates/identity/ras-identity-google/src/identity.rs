//! Access token to normalized identity.

use crate::claims::{ClaimVerifier, DecodedClaims};
use crate::client::GoogleClient;
use crate::config::GoogleOAuth2Options;
use crate::image::ImageUrlBuilder;
use crate::types::{AccessToken, RawIdentity};
use ras_identity_core::{
    IdentityError, IdentityExtra, IdentityInfo, IdentityResult, NormalizedIdentity, pruned,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Site name used for the profile link in `profile_urls`
pub const PROFILE_URL_KEY: &str = "Google";

/// Resolves the identity behind one access token.
///
/// Create one per callback. Profile, friends and claims are fetched or
/// decoded at most once and cached on this value only.
pub struct IdentityResolver<'a> {
    client: &'a GoogleClient,
    options: &'a GoogleOAuth2Options,
    access_token: &'a AccessToken,
    raw_payload: OnceCell<Value>,
    raw_identity: OnceCell<RawIdentity>,
    raw_friends: OnceCell<Value>,
    decoded_claims: OnceLock<Option<DecodedClaims>>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        client: &'a GoogleClient,
        options: &'a GoogleOAuth2Options,
        access_token: &'a AccessToken,
    ) -> Self {
        Self {
            client,
            options,
            access_token,
            raw_payload: OnceCell::new(),
            raw_identity: OnceCell::new(),
            raw_friends: OnceCell::new(),
            decoded_claims: OnceLock::new(),
        }
    }

    /// Profile body as Google sent it.
    pub async fn raw_payload(&self) -> IdentityResult<&Value> {
        self.raw_payload
            .get_or_try_init(|| {
                self.client.fetch_profile(
                    &self.options.client_options.profile_endpoint,
                    &self.access_token.access_token,
                )
            })
            .await
    }

    /// Typed view of [`Self::raw_payload`].
    pub async fn raw_identity(&self) -> IdentityResult<&RawIdentity> {
        self.raw_identity
            .get_or_try_init(|| async move {
                let payload = self.raw_payload().await?;
                RawIdentity::deserialize(payload)
                    .map_err(|e| IdentityError::ProfileFetch(e.into()))
            })
            .await
    }

    pub async fn raw_friends(&self, uid: &str) -> IdentityResult<&Value> {
        self.raw_friends
            .get_or_try_init(|| async move {
                let friends_url = self.options.client_options.friends_url(uid);
                self.client
                    .fetch_friends(&friends_url, &self.access_token.access_token)
                    .await
            })
            .await
    }

    /// Identity token claims, or `None` when there is no token or its claims
    /// did not check out.
    pub fn decoded_claims(&self) -> Option<&DecodedClaims> {
        self.decoded_claims
            .get_or_init(|| {
                ClaimVerifier::new(self.options)
                    .decode(self.access_token.id_token.as_deref())
                    .unwrap_or_else(|err| {
                        debug!("Leaving out identity token claims: {}", err);
                        None
                    })
            })
            .as_ref()
    }

    /// The subject, falling back to a verified email address.
    pub async fn uid(&self) -> IdentityResult<String> {
        let raw = self.raw_identity().await?;
        raw.subject()
            .or_else(|| raw.verified_email())
            .map(str::to_string)
            .ok_or(IdentityError::MissingUid)
    }

    pub async fn info(&self) -> IdentityResult<IdentityInfo> {
        let raw = self.raw_identity().await?;
        let image_url = ImageUrlBuilder::new(self.options.image_size, self.options.image_aspect)
            .build(raw.picture.as_deref());

        Ok(pruned(IdentityInfo {
            name: raw.name.clone(),
            email: raw.verified_email().map(str::to_string),
            first_name: raw.given_name.clone(),
            last_name: raw.family_name.clone(),
            image_url,
            profile_urls: BTreeMap::from([(PROFILE_URL_KEY.to_string(), raw.profile.clone())]),
        }))
    }

    pub async fn extra(&self) -> IdentityResult<IdentityExtra> {
        let mut extra = IdentityExtra {
            identity_token: self.access_token.id_token.clone(),
            decoded_claims: self.decoded_claims().cloned(),
            ..IdentityExtra::default()
        };

        if !self.options.skip_raw_info {
            extra.raw_identity = Some(self.raw_payload().await?.clone());

            if !self.options.skip_friend_lookup {
                let uid = self.uid().await?;
                extra.raw_friends = Some(self.raw_friends(&uid).await?.clone());
            }
        }

        Ok(pruned(extra))
    }

    pub async fn resolve(&self) -> IdentityResult<NormalizedIdentity> {
        let uid = self.uid().await?;
        let profile = self.info().await?;
        let extra = self.extra().await?;

        info!("Resolved Google identity for uid: {}", uid);
        Ok(NormalizedIdentity::new(&self.options.name, uid, profile, extra))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientOptions, ImageSize};
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, GoogleOAuth2Options, GoogleClient) {
        let mock_server = MockServer::start().await;
        let options = GoogleOAuth2Options::new("mock_client_id", "mock_secret").with_client_options(
            ClientOptions {
                profile_endpoint: format!("{}/people/me/openIdConnect", mock_server.uri()),
                friends_endpoint: format!("{}/people/{{uid}}/people/visible", mock_server.uri()),
                ..ClientOptions::default()
            },
        );
        (mock_server, options, GoogleClient::new(5).unwrap())
    }

    async fn mount_profile(mock_server: &MockServer, profile: serde_json::Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/people/me/openIdConnect"))
            .and(header("Authorization", "Bearer mock_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile))
            .expect(expected_calls)
            .mount(mock_server)
            .await;
    }

    fn id_token(exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        encode(
            &Header::default(),
            &json!({
                "iss": "accounts.google.com",
                "aud": "mock_client_id",
                "sub": "12345",
                "iat": now - 10,
                "exp": now + exp_offset
            }),
            &EncodingKey::from_secret(b"not-checked"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_uid_prefers_subject() {
        let (mock_server, options, client) = setup().await;
        mount_profile(
            &mock_server,
            json!({ "sub": "123", "email": "a@b.com", "email_verified": true }),
            1,
        )
        .await;

        let token = AccessToken::new("mock_access_token");
        let resolver = IdentityResolver::new(&client, &options, &token);
        assert_eq!(resolver.uid().await.unwrap(), "123");
    }

    #[tokio::test]
    async fn test_uid_falls_back_to_verified_email() {
        let (mock_server, options, client) = setup().await;
        mount_profile(
            &mock_server,
            json!({ "sub": "", "email": "a@b.com", "email_verified": true }),
            1,
        )
        .await;

        let token = AccessToken::new("mock_access_token");
        let resolver = IdentityResolver::new(&client, &options, &token);
        assert_eq!(resolver.uid().await.unwrap(), "a@b.com");
    }

    #[tokio::test]
    async fn test_unverified_email_without_subject_fails() {
        let (mock_server, options, client) = setup().await;
        mount_profile(
            &mock_server,
            json!({ "sub": "", "email": "a@b.com", "email_verified": false }),
            1,
        )
        .await;

        let token = AccessToken::new("mock_access_token");
        let resolver = IdentityResolver::new(&client, &options, &token);
        assert!(matches!(resolver.uid().await, Err(IdentityError::MissingUid)));
        assert!(matches!(resolver.resolve().await, Err(IdentityError::MissingUid)));
    }

    #[tokio::test]
    async fn test_profile_with_both_sub_and_id_resolves() {
        let (mock_server, options, client) = setup().await;
        mount_profile(&mock_server, json!({ "sub": "123", "id": "123", "name": "X" }), 1).await;

        let token = AccessToken::new("mock_access_token");
        let identity = IdentityResolver::new(&client, &options, &token)
            .resolve()
            .await
            .unwrap();

        assert_eq!(identity.uid, "123");
        assert_eq!(identity.info.name.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn test_legacy_id_is_the_uid() {
        let (mock_server, options, client) = setup().await;
        mount_profile(&mock_server, json!({ "id": "456" }), 1).await;

        let token = AccessToken::new("mock_access_token");
        let resolver = IdentityResolver::new(&client, &options, &token);
        assert_eq!(resolver.uid().await.unwrap(), "456");
    }

    #[tokio::test]
    async fn test_raw_identity_is_the_payload_as_sent() {
        let (mock_server, options, client) = setup().await;
        mount_profile(
            &mock_server,
            json!({
                "id": "123",
                "email": "a@b.com",
                "email_verified": "true",
                "image": { "url": "" }
            }),
            1,
        )
        .await;

        let token = AccessToken::new("mock_access_token");
        let identity = IdentityResolver::new(&client, &options, &token)
            .resolve()
            .await
            .unwrap();

        assert_eq!(identity.uid, "123");
        assert_eq!(identity.info.email.as_deref(), Some("a@b.com"));
        assert_eq!(
            identity.extra.raw_identity,
            Some(json!({ "id": "123", "email": "a@b.com", "email_verified": "true" }))
        );
    }

    #[tokio::test]
    async fn test_non_object_profile_is_a_fetch_failure() {
        let (mock_server, options, client) = setup().await;
        mount_profile(&mock_server, json!(["not", "a", "profile"]), 1).await;

        let token = AccessToken::new("mock_access_token");
        let result = IdentityResolver::new(&client, &options, &token).uid().await;
        assert!(matches!(result, Err(IdentityError::ProfileFetch(_))));
    }

    #[tokio::test]
    async fn test_profile_is_fetched_once() {
        let (mock_server, options, client) = setup().await;
        mount_profile(&mock_server, json!({ "sub": "123", "name": "Test User" }), 1).await;

        let token = AccessToken::new("mock_access_token");
        let resolver = IdentityResolver::new(&client, &options, &token);

        resolver.uid().await.unwrap();
        resolver.info().await.unwrap();
        resolver.extra().await.unwrap();
        resolver.resolve().await.unwrap();
    }

    #[tokio::test]
    async fn test_info_maps_and_prunes_profile_fields() {
        let (mock_server, options, client) = setup().await;
        let options = options.with_image_size(ImageSize::Pixels(50));
        mount_profile(
            &mock_server,
            json!({
                "sub": "123",
                "name": "Test User",
                "given_name": "Test",
                "family_name": "",
                "email": "a@b.com",
                "email_verified": "false",
                "picture": "https:https://lh3.googleusercontent.com/-abc/photo.jpg"
            }),
            1,
        )
        .await;

        let token = AccessToken::new("mock_access_token");
        let info = IdentityResolver::new(&client, &options, &token)
            .info()
            .await
            .unwrap();

        assert_eq!(info.name.as_deref(), Some("Test User"));
        assert_eq!(info.first_name.as_deref(), Some("Test"));
        assert_eq!(info.last_name, None);
        assert_eq!(info.email, None);
        assert_eq!(
            info.image_url.as_deref(),
            Some("https://lh3.googleusercontent.com/-abc/s50/photo.jpg")
        );
        assert!(info.profile_urls.is_empty());
    }

    #[tokio::test]
    async fn test_extra_includes_valid_claims_and_raw_identity() {
        let (mock_server, options, client) = setup().await;
        mount_profile(
            &mock_server,
            json!({ "sub": "12345", "kind": "plus#personOpenIdConnect", "profile": "" }),
            1,
        )
        .await;

        let mut token = AccessToken::new("mock_access_token");
        token.id_token = Some(id_token(3600));
        let extra = IdentityResolver::new(&client, &options, &token)
            .extra()
            .await
            .unwrap();

        assert_eq!(extra.identity_token, token.id_token);
        let claims = extra.decoded_claims.unwrap();
        assert_eq!(claims["sub"], "12345");
        assert_eq!(
            extra.raw_identity,
            Some(json!({ "sub": "12345", "kind": "plus#personOpenIdConnect" }))
        );
        assert!(extra.raw_friends.is_none());
    }

    #[tokio::test]
    async fn test_expired_claims_are_left_out_without_failing() {
        let (mock_server, options, client) = setup().await;
        mount_profile(&mock_server, json!({ "sub": "12345" }), 1).await;

        let mut token = AccessToken::new("mock_access_token");
        token.id_token = Some(id_token(-600));
        let identity = IdentityResolver::new(&client, &options, &token)
            .resolve()
            .await
            .unwrap();

        assert_eq!(identity.uid, "12345");
        assert!(identity.extra.decoded_claims.is_none());
        assert_eq!(identity.extra.identity_token, token.id_token);
    }

    #[tokio::test]
    async fn test_friends_lookup_keyed_by_uid() {
        let (mock_server, options, client) = setup().await;
        let options = options.with_friend_lookup(true);
        mount_profile(&mock_server, json!({ "sub": "12345" }), 1).await;

        Mock::given(method("GET"))
            .and(path("/people/12345/people/visible"))
            .and(header("Authorization", "Bearer mock_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "plus#peopleFeed",
                "totalItems": 1,
                "items": [{ "id": "67890", "displayName": "Friend" }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let token = AccessToken::new("mock_access_token");
        let resolver = IdentityResolver::new(&client, &options, &token);
        let extra = resolver.extra().await.unwrap();
        // Second call served from the cache
        resolver.extra().await.unwrap();

        assert_eq!(extra.raw_friends.unwrap()["totalItems"], 1);
    }

    #[tokio::test]
    async fn test_skip_raw_info_skips_friends_too() {
        let (mock_server, options, client) = setup().await;
        let options = options.with_friend_lookup(true).with_skip_raw_info(true);
        mount_profile(&mock_server, json!({ "sub": "12345" }), 1).await;

        Mock::given(method("GET"))
            .and(path("/people/12345/people/visible"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .expect(0)
            .mount(&mock_server)
            .await;

        let token = AccessToken::new("mock_access_token");
        let identity = IdentityResolver::new(&client, &options, &token)
            .resolve()
            .await
            .unwrap();

        assert!(identity.extra.raw_identity.is_none());
        assert!(identity.extra.raw_friends.is_none());
    }

    #[tokio::test]
    async fn test_profile_failure_is_fatal() {
        let (mock_server, options, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/people/me/openIdConnect"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": 401, "message": "Invalid Credentials" }
            })))
            .mount(&mock_server)
            .await;

        let token = AccessToken::new("mock_access_token");
        let result = IdentityResolver::new(&client, &options, &token).resolve().await;

        assert!(matches!(
            result,
            Err(IdentityError::ProfileFetch(ref err)) if err.to_string().contains("Invalid Credentials")
        ));
    }
}
