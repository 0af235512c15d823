//! Driving-out port for the external identity provider.
//!
//! The provider owns credentials, email verification, and password
//! resets. This service never stores a password; it exchanges
//! email/password pairs for a verified-or-not identity and keeps its own
//! account rows keyed by email.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::EmailAddress;

use super::define_port_error;

define_port_error! {
    /// Failures reported by identity provider adapters.
    pub enum IdentityProviderError {
        /// The email is already registered.
        EmailInUse { message: String } => "email already in use: {message}",
        /// The email/password pair did not authenticate.
        InvalidCredentials { message: String } => "invalid credentials: {message}",
        /// The password failed the provider's strength policy.
        WeakPassword { message: String } => "password rejected: {message}",
        /// The verification code was unknown or expired.
        InvalidCode { message: String } => "invalid verification code: {message}",
        /// No identity exists for the email.
        UnknownEmail { message: String } => "unknown email: {message}",
        /// The provider could not be reached.
        Unavailable { message: String } => "identity provider unavailable: {message}",
        /// The provider answered with an unexpected payload.
        Protocol { message: String } => "identity provider protocol error: {message}",
    }
}

/// Identity facts returned by sign-up and sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    /// Canonical email held by the provider.
    pub email: EmailAddress,
    /// Whether the email has been verified.
    pub verified: bool,
}

/// Driving-out port wrapping the provider's primitives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new identity.
    async fn sign_up(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<ProviderIdentity, IdentityProviderError>;

    /// Authenticate an email/password pair.
    async fn sign_in(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<ProviderIdentity, IdentityProviderError>;

    /// Send (or re-send) the verification email.
    async fn send_verification(&self, email: &EmailAddress)
    -> Result<(), IdentityProviderError>;

    /// Apply an emailed verification code; returns the verified email.
    async fn apply_verification_code(
        &self,
        code: &str,
    ) -> Result<EmailAddress, IdentityProviderError>;

    /// Send the password reset email.
    async fn send_password_reset(
        &self,
        email: &EmailAddress,
    ) -> Result<(), IdentityProviderError>;
}

#[derive(Debug, Clone)]
struct RegisteredIdentity {
    email: EmailAddress,
    password: String,
    verified: bool,
    pending_code: Option<String>,
}

/// In-memory identity provider used when no real provider is configured
/// and by handler tests.
///
/// Verification codes issued by [`IdentityProvider::send_verification`]
/// can be read back through [`MemoryIdentityProvider::issued_code`] so
/// tests can complete the verify flow.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    state: Mutex<HashMap<String, RegisteredIdentity>>,
}

impl MemoryIdentityProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-verified identity, for seeding dev logins.
    pub fn with_verified_identity(self, email: EmailAddress, password: impl Into<String>) -> Self {
        self.guard().insert(
            email.as_ref().to_owned(),
            RegisteredIdentity {
                email,
                password: password.into(),
                verified: true,
                pending_code: None,
            },
        );
        self
    }

    /// The verification code most recently issued for `email`, if any.
    pub fn issued_code(&self, email: &EmailAddress) -> Option<String> {
        self.guard()
            .get(email.as_ref())
            .and_then(|identity| identity.pending_code.clone())
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, RegisteredIdentity>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<ProviderIdentity, IdentityProviderError> {
        if password.chars().count() < 8 {
            return Err(IdentityProviderError::weak_password(
                "password must be at least 8 characters",
            ));
        }
        let mut state = self.guard();
        if state.contains_key(email.as_ref()) {
            return Err(IdentityProviderError::email_in_use(email.as_ref()));
        }
        state.insert(
            email.as_ref().to_owned(),
            RegisteredIdentity {
                email: email.clone(),
                password: password.to_owned(),
                verified: false,
                pending_code: None,
            },
        );
        Ok(ProviderIdentity {
            email: email.clone(),
            verified: false,
        })
    }

    async fn sign_in(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<ProviderIdentity, IdentityProviderError> {
        let state = self.guard();
        let identity = state
            .get(email.as_ref())
            .ok_or_else(|| IdentityProviderError::invalid_credentials("unknown email"))?;
        if identity.password != password {
            return Err(IdentityProviderError::invalid_credentials(
                "password mismatch",
            ));
        }
        Ok(ProviderIdentity {
            email: identity.email.clone(),
            verified: identity.verified,
        })
    }

    async fn send_verification(
        &self,
        email: &EmailAddress,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.guard();
        let identity = state
            .get_mut(email.as_ref())
            .ok_or_else(|| IdentityProviderError::unknown_email(email.as_ref()))?;
        identity.pending_code = Some(Uuid::new_v4().simple().to_string());
        Ok(())
    }

    async fn apply_verification_code(
        &self,
        code: &str,
    ) -> Result<EmailAddress, IdentityProviderError> {
        let mut state = self.guard();
        let identity = state
            .values_mut()
            .find(|identity| identity.pending_code.as_deref() == Some(code))
            .ok_or_else(|| IdentityProviderError::invalid_code("no matching code"))?;
        identity.verified = true;
        identity.pending_code = None;
        Ok(identity.email.clone())
    }

    async fn send_password_reset(
        &self,
        email: &EmailAddress,
    ) -> Result<(), IdentityProviderError> {
        let state = self.guard();
        if !state.contains_key(email.as_ref()) {
            return Err(IdentityProviderError::unknown_email(email.as_ref()));
        }
        Ok(())
    }
}
