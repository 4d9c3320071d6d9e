//! Identity token claim checks.
//!
//! Only claim content is enforced. The token signature is not verified; trust
//! in the token comes from receiving it over TLS straight from Google.

use crate::config::GoogleOAuth2Options;
use crate::error::ClaimError;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde_json::{Map, Value};

/// Issuers Google puts in identity tokens
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Decoded identity token body
pub type DecodedClaims = Map<String, Value>;

pub struct ClaimVerifier<'a> {
    options: &'a GoogleOAuth2Options,
}

impl<'a> ClaimVerifier<'a> {
    pub fn new(options: &'a GoogleOAuth2Options) -> Self {
        Self { options }
    }

    /// Decodes `id_token` and checks issuer, audience and the temporal claims.
    ///
    /// Issuer and audience are required. `exp`, `nbf` and `iat` are checked
    /// when present; `sub` and `jti` are passed through unchecked.
    pub fn decode(&self, id_token: Option<&str>) -> Result<Option<DecodedClaims>, ClaimError> {
        let Some(id_token) = id_token else {
            return Ok(None);
        };

        let data = decode::<DecodedClaims>(id_token, &DecodingKey::from_secret(&[]), &self.validation())?;
        self.check_issued_at(&data.claims)?;

        Ok(Some(data.claims))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.options.client_id.as_str()]);
        validation.set_required_spec_claims(&["iss", "aud"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = self.options.id_token_leeway_seconds;
        validation
    }

    fn check_issued_at(&self, claims: &DecodedClaims) -> Result<(), ClaimError> {
        let Some(iat) = claims.get("iat") else {
            return Ok(());
        };
        let iat = iat
            .as_f64()
            .ok_or_else(|| ClaimError::Malformed("iat is not a number".to_string()))?;

        let latest = (Utc::now().timestamp() as f64) + self.options.id_token_leeway_seconds as f64;
        if iat > latest {
            return Err(ClaimError::IssuedInFuture);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn options() -> GoogleOAuth2Options {
        GoogleOAuth2Options::new("mock_client_id", "mock_secret")
    }

    fn mint(claims: &Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"not-checked"),
        )
        .unwrap()
    }

    fn valid_claims() -> Value {
        let now = Utc::now().timestamp();
        json!({
            "iss": "accounts.google.com",
            "aud": "mock_client_id",
            "sub": "12345",
            "email": "test@example.com",
            "iat": now - 10,
            "nbf": now - 10,
            "exp": now + 3600
        })
    }

    #[test]
    fn test_absent_token_yields_no_claims() {
        let options = options();
        assert_eq!(ClaimVerifier::new(&options).decode(None), Ok(None));
    }

    #[test]
    fn test_valid_token_decodes_verbatim() {
        let options = options();
        let claims = valid_claims();

        let decoded = ClaimVerifier::new(&options)
            .decode(Some(&mint(&claims)))
            .unwrap()
            .unwrap();

        assert_eq!(Value::Object(decoded), claims);
    }

    #[test]
    fn test_https_issuer_is_accepted() {
        let options = options();
        let mut claims = valid_claims();
        claims["iss"] = json!("https://accounts.google.com");

        assert!(ClaimVerifier::new(&options).decode(Some(&mint(&claims))).is_ok());
    }

    #[test]
    fn test_expired_token_fails() {
        let options = options();
        let mut claims = valid_claims();
        claims["exp"] = json!(Utc::now().timestamp() - 600);

        assert_eq!(
            ClaimVerifier::new(&options).decode(Some(&mint(&claims))),
            Err(ClaimError::Expired)
        );
    }

    #[test]
    fn test_wrong_issuer_and_audience_fail() {
        let options = options();
        let verifier = ClaimVerifier::new(&options);

        let mut claims = valid_claims();
        claims["iss"] = json!("evil.example.com");
        assert_eq!(
            verifier.decode(Some(&mint(&claims))),
            Err(ClaimError::InvalidIssuer)
        );

        let mut claims = valid_claims();
        claims["aud"] = json!("another_client");
        assert_eq!(
            verifier.decode(Some(&mint(&claims))),
            Err(ClaimError::InvalidAudience)
        );
    }

    #[test]
    fn test_missing_audience_fails() {
        let options = options();
        let mut claims = valid_claims();
        claims.as_object_mut().unwrap().remove("aud");

        assert_eq!(
            ClaimVerifier::new(&options).decode(Some(&mint(&claims))),
            Err(ClaimError::MissingClaim("aud".to_string()))
        );
    }

    #[test]
    fn test_future_nbf_and_iat_fail() {
        let options = options();
        let verifier = ClaimVerifier::new(&options);
        let later = Utc::now().timestamp() + 600;

        let mut claims = valid_claims();
        claims["nbf"] = json!(later);
        assert_eq!(
            verifier.decode(Some(&mint(&claims))),
            Err(ClaimError::NotYetValid)
        );

        let mut claims = valid_claims();
        claims["iat"] = json!(later);
        assert_eq!(
            verifier.decode(Some(&mint(&claims))),
            Err(ClaimError::IssuedInFuture)
        );
    }

    #[test]
    fn test_temporal_claims_are_optional() {
        let options = options();
        let claims = json!({
            "iss": "accounts.google.com",
            "aud": "mock_client_id",
            "sub": "12345"
        });

        assert!(ClaimVerifier::new(&options).decode(Some(&mint(&claims))).is_ok());
    }

    /// `{"alg":"RS256","kid":"test-key","typ":"JWT"}`, base64url encoded
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsImtpZCI6InRlc3Qta2V5IiwidHlwIjoiSldUIn0";

    #[test]
    fn test_rs256_token_decodes_without_key() {
        let options = options();
        let claims = valid_claims();

        // Google's header on a body with a signature no key could verify
        let minted = mint(&claims);
        let (_, body_and_signature) = minted.split_once('.').unwrap();
        let token = format!("{RS256_HEADER}.{body_and_signature}");
        assert_eq!(
            jsonwebtoken::decode_header(&token).unwrap().alg,
            jsonwebtoken::Algorithm::RS256
        );

        let decoded = ClaimVerifier::new(&options)
            .decode(Some(&token))
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(decoded), claims);

        let mut expired = valid_claims();
        expired["exp"] = json!(Utc::now().timestamp() - 600);
        let minted = mint(&expired);
        let (_, body_and_signature) = minted.split_once('.').unwrap();
        assert_eq!(
            ClaimVerifier::new(&options).decode(Some(&format!("{RS256_HEADER}.{body_and_signature}"))),
            Err(ClaimError::Expired)
        );
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let options = options();
        assert!(matches!(
            ClaimVerifier::new(&options).decode(Some("not-a-jwt")),
            Err(ClaimError::Malformed(_))
        ));
    }
}
