//! Reqwest-backed adapter for the external identity provider.
//!
//! The provider exposes sign-up, sign-in, verification, and password
//! reset as JSON-over-HTTPS endpoints authenticated with an API key.
//! Its internals are out of scope; this adapter only maps the wire
//! contract onto the [`IdentityProvider`] port.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::domain::EmailAddress;
use crate::domain::ports::{IdentityProvider, IdentityProviderError, ProviderIdentity};

use super::dto::{
    CodeRequest, CredentialsRequest, EmailRequest, IdentityResponse, ProviderErrorResponse,
};

/// Reqwest-backed implementation of the [`IdentityProvider`] port.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    /// Create an adapter for the provider at `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    async fn post<T>(&self, path: &str, body: &T) -> Result<reqwest::Response, IdentityProviderError>
    where
        T: serde::Serialize + Sync,
    {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| IdentityProviderError::unavailable(err.to_string()))
    }

    async fn decode_error(response: reqwest::Response) -> IdentityProviderError {
        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return IdentityProviderError::unavailable(format!("provider answered {status}"));
        }
        match response.json::<ProviderErrorResponse>().await {
            Ok(envelope) => envelope.into_port_error(),
            Err(err) => IdentityProviderError::protocol(format!(
                "undecodable {status} error payload: {err}"
            )),
        }
    }

    async fn decode_identity(
        response: reqwest::Response,
    ) -> Result<ProviderIdentity, IdentityProviderError> {
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        let identity: IdentityResponse = response
            .json()
            .await
            .map_err(|err| IdentityProviderError::protocol(err.to_string()))?;
        let email = EmailAddress::new(&identity.email).map_err(|err| {
            IdentityProviderError::protocol(format!("provider returned invalid email: {err}"))
        })?;
        Ok(ProviderIdentity {
            email,
            verified: identity.verified,
        })
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), IdentityProviderError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::decode_error(response).await)
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_up(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<ProviderIdentity, IdentityProviderError> {
        let response = self
            .post(
                "identities",
                &CredentialsRequest {
                    email: email.as_ref(),
                    password,
                },
            )
            .await?;
        Self::decode_identity(response).await
    }

    async fn sign_in(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<ProviderIdentity, IdentityProviderError> {
        let response = self
            .post(
                "sessions",
                &CredentialsRequest {
                    email: email.as_ref(),
                    password,
                },
            )
            .await?;
        Self::decode_identity(response).await
    }

    async fn send_verification(
        &self,
        email: &EmailAddress,
    ) -> Result<(), IdentityProviderError> {
        let response = self
            .post(
                "verification-emails",
                &EmailRequest {
                    email: email.as_ref(),
                },
            )
            .await?;
        Self::expect_success(response).await
    }

    async fn apply_verification_code(
        &self,
        code: &str,
    ) -> Result<EmailAddress, IdentityProviderError> {
        let response = self.post("verifications", &CodeRequest { code }).await?;
        Ok(Self::decode_identity(response).await?.email)
    }

    async fn send_password_reset(
        &self,
        email: &EmailAddress,
    ) -> Result<(), IdentityProviderError> {
        let response = self
            .post(
                "password-resets",
                &EmailRequest {
                    email: email.as_ref(),
                },
            )
            .await?;
        Self::expect_success(response).await
    }
}
