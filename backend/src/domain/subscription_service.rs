//! Subscription lifecycle service.
//!
//! The unsubscribe cooldown is enforced here, on the server, against the
//! stored `subscribed_at`. The previous system only gated the button in
//! the client, with three different durations across copies of the page.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;

use super::ports::{
    NewsletterRepository, NewsletterStoreError, SubscriptionRepository, SubscriptionStoreError,
    SubscriptionView,
};
use super::subscription::remaining_whole_hours;
use super::{
    Error, NewsletterId, NewsletterStatus, Subscription, UNSUBSCRIBE_COOLDOWN_HOURS, UserId,
};

/// Subscription lifecycle service.
#[derive(Clone)]
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    newsletters: Arc<dyn NewsletterRepository>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    /// Create a new service with the given repositories.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        newsletters: Arc<dyn NewsletterRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            newsletters,
            clock,
        }
    }

    /// Subscribe a user to a published newsletter.
    ///
    /// Subscribing twice is a no-op; the original `subscribed_at` (and
    /// with it the cooldown anchor) is preserved. Drafts are invisible to
    /// subscribers, so targeting one reports `not_found`.
    pub async fn subscribe(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<(), Error> {
        let newsletter = self
            .newsletters
            .find(newsletter_id)
            .await
            .map_err(map_newsletter_error)?
            .filter(|n| n.status() == NewsletterStatus::Published)
            .ok_or_else(|| Error::not_found("newsletter not found"))?;

        let subscription = Subscription {
            user_id: *user_id,
            newsletter_id: *newsletter.id(),
            subscribed_at: self.clock.utc(),
        };
        self.subscriptions
            .insert_if_absent(&subscription)
            .await
            .map_err(map_subscription_error)?;
        Ok(())
    }

    /// Unsubscribe a user, unless the cooldown window is still open.
    pub async fn unsubscribe(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<(), Error> {
        let subscription = self
            .subscriptions
            .find(user_id, newsletter_id)
            .await
            .map_err(map_subscription_error)?
            .ok_or_else(|| Error::not_found("not subscribed to this newsletter"))?;

        if let Some(remaining) = subscription.cooldown_remaining(self.clock.utc()) {
            return Err(Error::conflict(format!(
                "you cannot unsubscribe within {UNSUBSCRIBE_COOLDOWN_HOURS} hours of subscribing"
            ))
            .with_details(json!({
                "code": "cooldown_active",
                "hoursRemaining": remaining_whole_hours(remaining),
            })));
        }

        self.subscriptions
            .delete(user_id, newsletter_id)
            .await
            .map_err(map_subscription_error)?;
        Ok(())
    }

    /// List the caller's subscriptions with newsletter metadata.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<SubscriptionView>, Error> {
        self.subscriptions
            .list_for_user(user_id)
            .await
            .map_err(map_subscription_error)
    }
}

fn map_newsletter_error(error: NewsletterStoreError) -> Error {
    match error {
        NewsletterStoreError::Connection { message } => {
            Error::service_unavailable(format!("newsletter store unavailable: {message}"))
        }
        NewsletterStoreError::Query { message } => {
            Error::internal(format!("newsletter store error: {message}"))
        }
    }
}

fn map_subscription_error(error: SubscriptionStoreError) -> Error {
    match error {
        SubscriptionStoreError::Connection { message } => {
            Error::service_unavailable(format!("subscription store unavailable: {message}"))
        }
        SubscriptionStoreError::Query { message } => {
            Error::internal(format!("subscription store error: {message}"))
        }
    }
}
