//! Wire types for the identity provider's REST API.
//!
//! Kept separate from the adapter so mapping stays testable without a
//! network.

use serde::{Deserialize, Serialize};

use crate::domain::ports::IdentityProviderError;

/// Credentials payload for sign-up and sign-in.
#[derive(Debug, Serialize)]
pub(crate) struct CredentialsRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Email-only payload for verification and reset triggers.
#[derive(Debug, Serialize)]
pub(crate) struct EmailRequest<'a> {
    pub email: &'a str,
}

/// Verification-code payload.
#[derive(Debug, Serialize)]
pub(crate) struct CodeRequest<'a> {
    pub code: &'a str,
}

/// Identity facts returned by sign-up, sign-in, and verification.
#[derive(Debug, Deserialize)]
pub(crate) struct IdentityResponse {
    pub email: String,
    #[serde(default)]
    pub verified: bool,
}

/// Error envelope returned by the provider on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ProviderErrorResponse {
    /// Translate the provider's error code into a port error.
    ///
    /// Unknown codes fall through to a protocol error carrying the raw
    /// payload for the logs.
    pub(crate) fn into_port_error(self) -> IdentityProviderError {
        let message = if self.message.is_empty() {
            self.code.clone()
        } else {
            self.message.clone()
        };
        match self.code.as_str() {
            "EMAIL_EXISTS" => IdentityProviderError::email_in_use(message),
            "INVALID_CREDENTIALS" | "INVALID_PASSWORD" | "USER_DISABLED" => {
                IdentityProviderError::invalid_credentials(message)
            }
            "WEAK_PASSWORD" => IdentityProviderError::weak_password(message),
            "INVALID_CODE" | "EXPIRED_CODE" => IdentityProviderError::invalid_code(message),
            "EMAIL_NOT_FOUND" => IdentityProviderError::unknown_email(message),
            other => IdentityProviderError::protocol(format!(
                "unrecognised provider error code {other:?}: {message}"
            )),
        }
    }
}
