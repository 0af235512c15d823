//! Account lifecycle service.
//!
//! Wraps the external identity provider and the local account store.
//! Profiles are created once, on the first verified interaction, with the
//! subscriber role; the previous system re-ran a get-or-create in every
//! page's auth observer.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;

use super::ports::{
    IdentityProvider, IdentityProviderError, UserRepository, UserStoreError,
};
use super::{Account, DisplayName, EmailAddress, Error, Role, UserId};

/// Account lifecycle service implementing the auth and user-administration
/// operations.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Create a new service with the given collaborators.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            users,
            clock,
        }
    }

    /// Register a new identity and create its subscriber profile.
    ///
    /// The verification email is sent before this returns; the account
    /// cannot log in until the code is applied.
    pub async fn sign_up(&self, email: EmailAddress, password: &str) -> Result<(), Error> {
        let identity = self
            .identity
            .sign_up(&email, password)
            .await
            .map_err(map_identity_error)?;
        self.identity
            .send_verification(&identity.email)
            .await
            .map_err(map_identity_error)?;
        self.ensure_account(identity.email).await?;
        Ok(())
    }

    /// Authenticate an email/password pair and return the local account.
    ///
    /// Unverified identities and disabled accounts are rejected with
    /// `forbidden`; the session is never established for them.
    pub async fn login(&self, email: EmailAddress, password: &str) -> Result<Account, Error> {
        let identity = self
            .identity
            .sign_in(&email, password)
            .await
            .map_err(map_identity_error)?;
        if !identity.verified {
            return Err(Error::forbidden("email address is not verified")
                .with_details(json!({ "code": "email_not_verified" })));
        }
        let account = self.ensure_account(identity.email).await?;
        if account.is_disabled() {
            return Err(Error::forbidden("account is disabled")
                .with_details(json!({ "code": "account_disabled" })));
        }
        Ok(account)
    }

    /// Apply an emailed verification code.
    pub async fn verify_email(&self, code: &str) -> Result<(), Error> {
        self.identity
            .apply_verification_code(code)
            .await
            .map_err(map_identity_error)?;
        Ok(())
    }

    /// Trigger the provider's password reset email.
    ///
    /// An unknown email is reported as success so the endpoint cannot be
    /// used to enumerate accounts.
    pub async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), Error> {
        match self.identity.send_password_reset(email).await {
            Ok(()) | Err(IdentityProviderError::UnknownEmail { .. }) => Ok(()),
            Err(err) => Err(map_identity_error(err)),
        }
    }

    /// Fetch the account behind an authenticated session.
    pub async fn current(&self, user_id: &UserId) -> Result<Account, Error> {
        self.users
            .find(user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::unauthorized("session account no longer exists"))
    }

    /// Update the caller's display name.
    pub async fn update_display_name(
        &self,
        user_id: &UserId,
        display_name: DisplayName,
    ) -> Result<Account, Error> {
        let updated = self
            .users
            .update_display_name(user_id, &display_name)
            .await
            .map_err(map_store_error)?;
        if !updated {
            return Err(Error::not_found("account not found"));
        }
        self.current(user_id).await
    }

    /// List subscriber accounts for the admin console.
    pub async fn list_subscribers(&self) -> Result<Vec<Account>, Error> {
        self.users.list_subscribers().await.map_err(map_store_error)
    }

    /// Enable or disable a subscriber account.
    pub async fn set_disabled(&self, user_id: &UserId, disabled: bool) -> Result<(), Error> {
        let updated = self
            .users
            .set_disabled(user_id, disabled)
            .await
            .map_err(map_store_error)?;
        if !updated {
            return Err(Error::not_found("account not found"));
        }
        Ok(())
    }

    /// Delete an account along with its subscriptions and replies.
    pub async fn delete(&self, user_id: &UserId) -> Result<(), Error> {
        let deleted = self.users.delete(user_id).await.map_err(map_store_error)?;
        if !deleted {
            return Err(Error::not_found("account not found"));
        }
        Ok(())
    }

    async fn ensure_account(&self, email: EmailAddress) -> Result<Account, Error> {
        if let Some(existing) = self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_store_error)?
        {
            return Ok(existing);
        }

        let display_name = default_display_name(&email)?;
        let account = Account::new(
            UserId::random(),
            email,
            display_name,
            Role::User,
            false,
            self.clock.utc(),
        );
        self.users
            .insert_if_absent(&account)
            .await
            .map_err(map_store_error)
    }
}

/// Initial display name derived from the email's local part.
fn default_display_name(email: &EmailAddress) -> Result<DisplayName, Error> {
    let local = email.as_ref().split('@').next().unwrap_or_default();
    DisplayName::new(local)
        .or_else(|_| DisplayName::new("Subscriber"))
        .map_err(|err| Error::internal(format!("default display name invalid: {err}")))
}

fn map_store_error(error: UserStoreError) -> Error {
    match error {
        UserStoreError::Connection { message } => {
            Error::service_unavailable(format!("account store unavailable: {message}"))
        }
        UserStoreError::Query { message } => {
            Error::internal(format!("account store error: {message}"))
        }
    }
}

fn map_identity_error(error: IdentityProviderError) -> Error {
    match error {
        IdentityProviderError::EmailInUse { .. } => {
            Error::conflict("an account already exists for this email")
                .with_details(json!({ "code": "email_in_use" }))
        }
        IdentityProviderError::InvalidCredentials { .. } => {
            Error::unauthorized("invalid credentials")
        }
        IdentityProviderError::WeakPassword { message } => Error::invalid_request(message)
            .with_details(json!({ "field": "password", "code": "weak_password" })),
        IdentityProviderError::InvalidCode { .. } => {
            Error::invalid_request("verification code is invalid or expired")
                .with_details(json!({ "field": "code", "code": "invalid_code" }))
        }
        IdentityProviderError::UnknownEmail { .. } => Error::not_found("no account for this email"),
        IdentityProviderError::Unavailable { message } => {
            Error::service_unavailable(format!("identity provider unavailable: {message}"))
        }
        IdentityProviderError::Protocol { message } => {
            Error::internal(format!("identity provider protocol error: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MemoryIdentityProvider, MemoryUserRepository};
    use crate::domain::test_support::fixture_clock;

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw).expect("valid email")
    }

    fn service_with(provider: MemoryIdentityProvider) -> (AccountService, Arc<MemoryUserRepository>)
    {
        let users = Arc::new(MemoryUserRepository::new());
        let service = AccountService::new(
            Arc::new(provider),
            Arc::clone(&users) as Arc<dyn UserRepository>,
            fixture_clock(),
        );
        (service, users)
    }

    #[tokio::test]
    async fn sign_up_creates_a_subscriber_profile() {
        let (service, users) = service_with(MemoryIdentityProvider::new());
        service
            .sign_up(email("reader@example.com"), "correct horse")
            .await
            .expect("sign up");

        let account = users
            .find_by_email(&email("reader@example.com"))
            .await
            .expect("find")
            .expect("profile created");
        assert_eq!(account.role(), Role::User);
        assert_eq!(account.display_name().as_ref(), "reader");
    }

    #[tokio::test]
    async fn unverified_login_is_forbidden() {
        let (service, _) = service_with(MemoryIdentityProvider::new());
        service
            .sign_up(email("reader@example.com"), "correct horse")
            .await
            .expect("sign up");

        let err = service
            .login(email("reader@example.com"), "correct horse")
            .await
            .expect_err("unverified login must fail");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn verified_login_returns_the_same_profile() {
        let provider =
            MemoryIdentityProvider::new().with_verified_identity(email("reader@example.com"), "pw");
        let (service, _) = service_with(provider);

        let first = service
            .login(email("reader@example.com"), "pw")
            .await
            .expect("first login");
        let second = service
            .login(email("reader@example.com"), "pw")
            .await
            .expect("second login");
        assert_eq!(first.id(), second.id());
    }

    #[tokio::test]
    async fn disabled_accounts_cannot_log_in() {
        let provider =
            MemoryIdentityProvider::new().with_verified_identity(email("reader@example.com"), "pw");
        let (service, _) = service_with(provider);

        let account = service
            .login(email("reader@example.com"), "pw")
            .await
            .expect("first login");
        service
            .set_disabled(account.id(), true)
            .await
            .expect("disable");

        let err = service
            .login(email("reader@example.com"), "pw")
            .await
            .expect_err("disabled login must fail");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let provider =
            MemoryIdentityProvider::new().with_verified_identity(email("reader@example.com"), "pw");
        let (service, _) = service_with(provider);

        let err = service
            .login(email("reader@example.com"), "nope")
            .await
            .expect_err("wrong password must fail");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn password_reset_never_reveals_unknown_emails() {
        let (service, _) = service_with(MemoryIdentityProvider::new());
        service
            .request_password_reset(&email("ghost@example.com"))
            .await
            .expect("reset reports success");
    }

    #[tokio::test]
    async fn deleting_a_missing_account_is_not_found() {
        let (service, _) = service_with(MemoryIdentityProvider::new());
        let err = service
            .delete(&UserId::random())
            .await
            .expect_err("missing account");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
