//! Port abstraction for account persistence adapters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Account, DisplayName, EmailAddress, Role, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by account store adapters.
    pub enum UserStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "account store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "account store query failed: {message}",
    }
}

/// Driven port for account persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch an account by identifier.
    async fn find(&self, id: &UserId) -> Result<Option<Account>, UserStoreError>;

    /// Fetch an account by email address.
    async fn find_by_email(&self, email: &EmailAddress)
    -> Result<Option<Account>, UserStoreError>;

    /// Insert the account unless one already exists for its email; the
    /// stored account wins either way.
    async fn insert_if_absent(&self, account: &Account) -> Result<Account, UserStoreError>;

    /// Update the display name; `false` when no row matched.
    async fn update_display_name(
        &self,
        id: &UserId,
        display_name: &DisplayName,
    ) -> Result<bool, UserStoreError>;

    /// Flip the disabled flag; `false` when no row matched.
    async fn set_disabled(&self, id: &UserId, disabled: bool) -> Result<bool, UserStoreError>;

    /// Delete an account; `false` when no row matched.
    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError>;

    /// List accounts holding the subscriber role, newest first.
    async fn list_subscribers(&self) -> Result<Vec<Account>, UserStoreError>;

    /// Number of subscriber accounts that are not disabled.
    async fn count_active_subscribers(&self) -> Result<u64, UserStoreError>;

    /// Number of subscriber accounts created in `[from, to)`.
    async fn count_subscribers_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, UserStoreError>;
}

/// In-memory account store used when no database is configured and by
/// handler tests.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    state: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryUserRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<Uuid, Account>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find(&self, id: &UserId) -> Result<Option<Account>, UserStoreError> {
        Ok(self.guard().get(id.as_uuid()).cloned())
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Account>, UserStoreError> {
        Ok(self
            .guard()
            .values()
            .find(|account| account.email() == email)
            .cloned())
    }

    async fn insert_if_absent(&self, account: &Account) -> Result<Account, UserStoreError> {
        let mut state = self.guard();
        if let Some(existing) = state
            .values()
            .find(|candidate| candidate.email() == account.email())
        {
            return Ok(existing.clone());
        }
        state.insert(*account.id().as_uuid(), account.clone());
        Ok(account.clone())
    }

    async fn update_display_name(
        &self,
        id: &UserId,
        display_name: &DisplayName,
    ) -> Result<bool, UserStoreError> {
        let mut state = self.guard();
        match state.get_mut(id.as_uuid()) {
            Some(account) => {
                *account = account.clone().with_display_name(display_name.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_disabled(&self, id: &UserId, disabled: bool) -> Result<bool, UserStoreError> {
        let mut state = self.guard();
        match state.get_mut(id.as_uuid()) {
            Some(account) => {
                *account = Account::new(
                    *account.id(),
                    account.email().clone(),
                    account.display_name().clone(),
                    account.role(),
                    disabled,
                    account.created_at(),
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError> {
        Ok(self.guard().remove(id.as_uuid()).is_some())
    }

    async fn list_subscribers(&self) -> Result<Vec<Account>, UserStoreError> {
        let mut subscribers: Vec<Account> = self
            .guard()
            .values()
            .filter(|account| account.role() == Role::User)
            .cloned()
            .collect();
        subscribers.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(subscribers)
    }

    async fn count_active_subscribers(&self) -> Result<u64, UserStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|account| account.role() == Role::User && !account.is_disabled())
            .count() as u64)
    }

    async fn count_subscribers_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, UserStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|account| {
                account.role() == Role::User
                    && account.created_at() >= from
                    && account.created_at() < to
            })
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn account(email: &str, role: Role) -> Account {
        Account::new(
            UserId::random(),
            EmailAddress::new(email).expect("valid email"),
            DisplayName::new("Reader").expect("valid name"),
            role,
            false,
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
        )
    }

    #[tokio::test]
    async fn insert_if_absent_preserves_the_first_account() {
        let repo = MemoryUserRepository::new();
        let first = account("reader@example.com", Role::User);
        let second = account("reader@example.com", Role::User);

        let stored_first = repo.insert_if_absent(&first).await.expect("insert");
        let stored_second = repo.insert_if_absent(&second).await.expect("insert");

        assert_eq!(stored_first.id(), first.id());
        assert_eq!(stored_second.id(), first.id());
    }

    #[tokio::test]
    async fn list_subscribers_excludes_admins() {
        let repo = MemoryUserRepository::new();
        repo.insert_if_absent(&account("reader@example.com", Role::User))
            .await
            .expect("insert");
        repo.insert_if_absent(&account("editor@example.com", Role::Admin))
            .await
            .expect("insert");

        let subscribers = repo.list_subscribers().await.expect("list");
        assert_eq!(subscribers.len(), 1);
        assert_eq!(
            subscribers.first().map(|a| a.email().as_ref()),
            Some("reader@example.com")
        );
    }

    #[tokio::test]
    async fn disabled_subscribers_are_not_active() {
        let repo = MemoryUserRepository::new();
        let reader = repo
            .insert_if_absent(&account("reader@example.com", Role::User))
            .await
            .expect("insert");
        assert_eq!(repo.count_active_subscribers().await.expect("count"), 1);

        assert!(
            repo.set_disabled(reader.id(), true)
                .await
                .expect("set disabled")
        );
        assert_eq!(repo.count_active_subscribers().await.expect("count"), 0);
    }
}
