//! Port abstraction for the subscription relation.
//!
//! Subscriptions are the single canonical record of who is opted into
//! what: a `(user, newsletter, subscribed_at)` join relation. Subscriber
//! counts are always derived from it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Newsletter, NewsletterId, Subscription, UserId};

use super::define_port_error;
use super::newsletter_repository::{MemoryNewsletterRepository, NewsletterRepository};

define_port_error! {
    /// Persistence errors raised by subscription store adapters.
    pub enum SubscriptionStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "subscription store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "subscription store query failed: {message}",
    }
}

/// Subscription joined with its newsletter for subscriber-facing lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionView {
    /// The subscription row.
    pub subscription: Subscription,
    /// The newsletter it targets.
    pub newsletter: Newsletter,
}

/// Driven port for subscription persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Record a subscription unless one already exists for the pair;
    /// `true` when a row was created. An existing row keeps its original
    /// `subscribed_at`.
    async fn insert_if_absent(
        &self,
        subscription: &Subscription,
    ) -> Result<bool, SubscriptionStoreError>;

    /// Remove a subscription; `false` when no row matched.
    async fn delete(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<bool, SubscriptionStoreError>;

    /// Fetch the subscription for a pair, if present.
    async fn find(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<Option<Subscription>, SubscriptionStoreError>;

    /// List a user's subscriptions joined with newsletter metadata,
    /// most recently subscribed first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionView>, SubscriptionStoreError>;

    /// Number of subscriptions targeting one newsletter.
    async fn count_for_newsletter(
        &self,
        newsletter_id: &NewsletterId,
    ) -> Result<u64, SubscriptionStoreError>;

    /// Subscription counts for a batch of newsletters. Newsletters with
    /// no subscribers may be absent from the result.
    async fn counts_for_newsletters(
        &self,
        newsletter_ids: &[NewsletterId],
    ) -> Result<Vec<(NewsletterId, u64)>, SubscriptionStoreError>;
}

/// In-memory subscription store used when no database is configured and
/// by handler tests. Joins against the shared in-memory newsletter store.
pub struct MemorySubscriptionRepository {
    newsletters: Arc<MemoryNewsletterRepository>,
    state: Mutex<HashMap<(Uuid, Uuid), Subscription>>,
}

impl MemorySubscriptionRepository {
    /// Create an empty store joining against `newsletters`.
    pub fn new(newsletters: Arc<MemoryNewsletterRepository>) -> Self {
        Self {
            newsletters,
            state: Mutex::new(HashMap::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<(Uuid, Uuid), Subscription>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepository {
    async fn insert_if_absent(
        &self,
        subscription: &Subscription,
    ) -> Result<bool, SubscriptionStoreError> {
        let key = (
            *subscription.user_id.as_uuid(),
            *subscription.newsletter_id.as_uuid(),
        );
        let mut state = self.guard();
        if state.contains_key(&key) {
            return Ok(false);
        }
        state.insert(key, *subscription);
        Ok(true)
    }

    async fn delete(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<bool, SubscriptionStoreError> {
        let key = (*user_id.as_uuid(), *newsletter_id.as_uuid());
        Ok(self.guard().remove(&key).is_some())
    }

    async fn find(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<Option<Subscription>, SubscriptionStoreError> {
        let key = (*user_id.as_uuid(), *newsletter_id.as_uuid());
        Ok(self.guard().get(&key).copied())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionView>, SubscriptionStoreError> {
        let mut subscriptions: Vec<Subscription> = self
            .guard()
            .values()
            .filter(|sub| sub.user_id == *user_id)
            .copied()
            .collect();
        subscriptions.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));

        let mut views = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let newsletter = self
                .newsletters
                .find(&subscription.newsletter_id)
                .await
                .map_err(|err| SubscriptionStoreError::query(err.to_string()))?;
            // Rows orphaned by a newsletter delete are skipped, matching
            // the cascade the relational adapter gets for free.
            if let Some(newsletter) = newsletter {
                views.push(SubscriptionView {
                    subscription,
                    newsletter,
                });
            }
        }
        Ok(views)
    }

    async fn count_for_newsletter(
        &self,
        newsletter_id: &NewsletterId,
    ) -> Result<u64, SubscriptionStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|sub| sub.newsletter_id == *newsletter_id)
            .count() as u64)
    }

    async fn counts_for_newsletters(
        &self,
        newsletter_ids: &[NewsletterId],
    ) -> Result<Vec<(NewsletterId, u64)>, SubscriptionStoreError> {
        let state = self.guard();
        let mut counts = Vec::with_capacity(newsletter_ids.len());
        for id in newsletter_ids {
            let count = state
                .values()
                .filter(|sub| sub.newsletter_id == *id)
                .count() as u64;
            if count > 0 {
                counts.push((*id, count));
            }
        }
        Ok(counts)
    }
}
