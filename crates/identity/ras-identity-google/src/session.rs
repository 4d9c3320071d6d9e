//! Request-scoped session state for CSRF protection.

use crate::error::{AcquisitionError, AcquisitionResult};
use std::collections::HashMap;
use tracing::warn;

/// Session key under which the outbound `state` parameter is remembered
pub const STATE_SESSION_KEY: &str = "google_oauth2.state";

/// Session storage owned by the surrounding web framework.
pub trait SessionState: Send {
    fn store(&mut self, key: &str, value: String);

    /// Removes and returns a stored value.
    fn take(&mut self, key: &str) -> Option<String>;
}

impl SessionState for HashMap<String, String> {
    fn store(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn take(&mut self, key: &str) -> Option<String> {
        self.remove(key)
    }
}

/// Checks the callback `state` against the one stored before the redirect.
///
/// The stored value is consumed whether or not it matches.
pub fn verify_state(
    session: &mut dyn SessionState,
    callback_state: Option<&str>,
) -> AcquisitionResult<()> {
    let stored = session.take(STATE_SESSION_KEY);

    match (stored.as_deref(), callback_state) {
        (Some(expected), Some(actual)) if !actual.is_empty() && expected == actual => Ok(()),
        _ => {
            warn!("Callback state does not match the stored session state");
            Err(AcquisitionError::InvalidState)
        }
    }
}
