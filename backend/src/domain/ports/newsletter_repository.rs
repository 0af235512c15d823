//! Port abstraction for newsletter persistence adapters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Newsletter, NewsletterId, NewsletterStatus};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by newsletter store adapters.
    pub enum NewsletterStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "newsletter store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "newsletter store query failed: {message}",
    }
}

/// Driven port for newsletter persistence.
///
/// Listings are ordered newest first by creation timestamp.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    /// Persist a new newsletter.
    async fn insert(&self, newsletter: &Newsletter) -> Result<(), NewsletterStoreError>;

    /// Replace an existing newsletter; `false` when no row matched.
    async fn update(&self, newsletter: &Newsletter) -> Result<bool, NewsletterStoreError>;

    /// Delete a newsletter; `false` when no row matched.
    async fn delete(&self, id: &NewsletterId) -> Result<bool, NewsletterStoreError>;

    /// Fetch a newsletter by identifier.
    async fn find(&self, id: &NewsletterId) -> Result<Option<Newsletter>, NewsletterStoreError>;

    /// List newsletters of any status.
    async fn list(&self, limit: Option<u32>) -> Result<Vec<Newsletter>, NewsletterStoreError>;

    /// List published newsletters only.
    async fn list_published(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<Newsletter>, NewsletterStoreError>;

    /// The most recently published newsletter, if any.
    async fn last_published(&self) -> Result<Option<Newsletter>, NewsletterStoreError>;

    /// Total number of newsletters, drafts included.
    async fn count(&self) -> Result<u64, NewsletterStoreError>;

    /// Number of newsletters created in `[from, to)`.
    async fn count_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, NewsletterStoreError>;
}

/// In-memory newsletter store used when no database is configured and by
/// handler tests.
#[derive(Debug, Default)]
pub struct MemoryNewsletterRepository {
    state: Mutex<HashMap<Uuid, Newsletter>>,
}

impl MemoryNewsletterRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<Uuid, Newsletter>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sorted(mut items: Vec<Newsletter>, limit: Option<u32>) -> Vec<Newsletter> {
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        match limit {
            Some(limit) => items.into_iter().take(limit as usize).collect(),
            None => items,
        }
    }
}

#[async_trait]
impl NewsletterRepository for MemoryNewsletterRepository {
    async fn insert(&self, newsletter: &Newsletter) -> Result<(), NewsletterStoreError> {
        self.guard()
            .insert(*newsletter.id().as_uuid(), newsletter.clone());
        Ok(())
    }

    async fn update(&self, newsletter: &Newsletter) -> Result<bool, NewsletterStoreError> {
        let mut state = self.guard();
        match state.get_mut(newsletter.id().as_uuid()) {
            Some(existing) => {
                *existing = newsletter.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &NewsletterId) -> Result<bool, NewsletterStoreError> {
        Ok(self.guard().remove(id.as_uuid()).is_some())
    }

    async fn find(&self, id: &NewsletterId) -> Result<Option<Newsletter>, NewsletterStoreError> {
        Ok(self.guard().get(id.as_uuid()).cloned())
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<Newsletter>, NewsletterStoreError> {
        let items = self.guard().values().cloned().collect();
        Ok(Self::sorted(items, limit))
    }

    async fn list_published(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<Newsletter>, NewsletterStoreError> {
        let items = self
            .guard()
            .values()
            .filter(|n| n.status() == NewsletterStatus::Published)
            .cloned()
            .collect();
        Ok(Self::sorted(items, limit))
    }

    async fn last_published(&self) -> Result<Option<Newsletter>, NewsletterStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|n| n.published_at().is_some())
            .max_by_key(|n| n.published_at())
            .cloned())
    }

    async fn count(&self) -> Result<u64, NewsletterStoreError> {
        Ok(self.guard().len() as u64)
    }

    async fn count_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, NewsletterStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|n| n.created_at() >= from && n.created_at() < to)
            .count() as u64)
    }
}
