//! Verification of caller-supplied token pairs.

use crate::client::GoogleClient;
use crate::config::GoogleOAuth2Options;
use crate::error::VerificationFailure;
use tracing::debug;

/// Confirms an (identity token, access token) pair was issued to this client.
pub struct TokenInfoVerifier<'a> {
    client: &'a GoogleClient,
    options: &'a GoogleOAuth2Options,
}

impl<'a> TokenInfoVerifier<'a> {
    pub fn new(client: &'a GoogleClient, options: &'a GoogleOAuth2Options) -> Self {
        Self { client, options }
    }

    /// Succeeds iff Google reports the pair as issued to the configured client id.
    ///
    /// Missing tokens fail without a network call.
    pub async fn verify(
        &self,
        id_token: Option<&str>,
        access_token: Option<&str>,
    ) -> Result<(), VerificationFailure> {
        let (Some(id_token), Some(access_token)) = (id_token, access_token) else {
            return Err(VerificationFailure::MissingToken);
        };

        let token_info = self
            .client
            .token_info(
                &self.options.client_options.token_info_endpoint,
                id_token,
                access_token,
            )
            .await?;

        if token_info.issued_to.as_deref() == Some(self.options.client_id.as_str()) {
            debug!("Token pair verified for client {}", self.options.client_id);
            Ok(())
        } else {
            Err(VerificationFailure::IssuedToMismatch {
                expected: self.options.client_id.clone(),
                actual: token_info.issued_to,
            })
        }
    }
}
