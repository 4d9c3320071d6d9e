//! Google OAuth2 strategy error types.

use jsonwebtoken::errors::ErrorKind;
use ras_identity_core::IdentityError;
use thiserror::Error;

pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

pub type GoogleOAuth2Result<T> = Result<T, GoogleOAuth2Error>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing client id")]
    MissingClientId,

    #[error("Missing client secret")]
    MissingClientSecret,

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure to obtain an access token for a callback.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("Missing access token")]
    MissingAccessToken,

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Callback error: {0}")]
    CallbackError(String),
}

/// Failed bearer-authorized GET against a Google API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request rejected with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// A caller-supplied token pair could not be trusted.
///
/// Never fatal: the acquisition router moves on to the next strategy.
#[derive(Debug, Error)]
pub enum VerificationFailure {
    #[error("Identity token and access token are both required")]
    MissingToken,

    #[error("Token info request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Token info request rejected with status {0}")]
    Rejected(reqwest::StatusCode),

    #[error("Invalid token info response: {0}")]
    InvalidResponse(String),

    #[error("Token issued to {actual:?}, expected {expected}")]
    IssuedToMismatch {
        expected: String,
        actual: Option<String>,
    },
}

/// An identity token failed its claim checks.
///
/// Never fatal: the decoded claims are left out of the identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("Token has expired")]
    Expired,

    #[error("Token is not yet valid")]
    NotYetValid,

    #[error("Token was issued in the future")]
    IssuedInFuture,

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Malformed identity token: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for ClaimError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidIssuer => ClaimError::InvalidIssuer,
            ErrorKind::InvalidAudience => ClaimError::InvalidAudience,
            ErrorKind::ExpiredSignature => ClaimError::Expired,
            ErrorKind::ImmatureSignature => ClaimError::NotYetValid,
            ErrorKind::MissingRequiredClaim(claim) => ClaimError::MissingClaim(claim.clone()),
            _ => ClaimError::Malformed(err.to_string()),
        }
    }
}

/// Everything that can end a callback phase.
#[derive(Debug, Error)]
pub enum GoogleOAuth2Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Token acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}
