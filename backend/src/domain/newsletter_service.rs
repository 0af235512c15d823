//! Newsletter authoring and browsing service.
//!
//! Subscriber and reply counts are derived from the subscription and
//! reply relations on every read; the newsletter row never stores a
//! counter that could drift.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use uuid::Uuid;

use super::ports::{
    NewsletterRepository, NewsletterStoreError, ReplyRepository, ReplyStoreError,
    SubscriptionRepository, SubscriptionStoreError,
};
use super::{
    DisplayName, Error, Newsletter, NewsletterDraft, NewsletterId, NewsletterStatus, UserId,
};

/// Newsletter joined with derived counts for the admin console.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsletterOverview {
    /// The newsletter itself.
    pub newsletter: Newsletter,
    /// Live subscription count.
    pub subscriber_count: u64,
    /// Live reply count.
    pub reply_count: u64,
}

/// Published newsletter joined with the viewer's subscription state.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedNewsletter {
    /// The newsletter itself.
    pub newsletter: Newsletter,
    /// Live subscription count.
    pub subscriber_count: u64,
    /// When the viewer subscribed, if they did.
    pub subscribed_at: Option<DateTime<Utc>>,
}

/// Newsletter authoring and browsing service.
#[derive(Clone)]
pub struct NewsletterService {
    newsletters: Arc<dyn NewsletterRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    replies: Arc<dyn ReplyRepository>,
    clock: Arc<dyn Clock>,
}

impl NewsletterService {
    /// Create a new service with the given repositories.
    pub fn new(
        newsletters: Arc<dyn NewsletterRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        replies: Arc<dyn ReplyRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            newsletters,
            subscriptions,
            replies,
            clock,
        }
    }

    /// Create a newsletter as a draft or publish it immediately.
    pub async fn create(
        &self,
        draft: NewsletterDraft,
        author: DisplayName,
        publish: bool,
    ) -> Result<Newsletter, Error> {
        let now = self.clock.utc();
        let status = if publish {
            NewsletterStatus::Published
        } else {
            NewsletterStatus::Draft
        };
        let newsletter = Newsletter::new(
            NewsletterId::random(),
            draft,
            author,
            status,
            Some(now),
            now,
        );
        self.newsletters
            .insert(&newsletter)
            .await
            .map_err(map_newsletter_error)?;
        Ok(newsletter)
    }

    /// Revise an existing newsletter, optionally publishing it.
    ///
    /// The first publication timestamp is preserved across later edits.
    pub async fn update(
        &self,
        id: &NewsletterId,
        draft: NewsletterDraft,
        publish: bool,
    ) -> Result<Newsletter, Error> {
        let existing = self.require(id).await?;
        let status = if publish {
            NewsletterStatus::Published
        } else {
            NewsletterStatus::Draft
        };
        let published_at = match existing.published_at() {
            Some(first) if publish => Some(first),
            _ => Some(self.clock.utc()),
        };
        let revised = Newsletter::new(
            *id,
            draft,
            existing.author().clone(),
            status,
            published_at,
            existing.created_at(),
        );
        let updated = self
            .newsletters
            .update(&revised)
            .await
            .map_err(map_newsletter_error)?;
        if !updated {
            return Err(Error::not_found("newsletter not found"));
        }
        Ok(revised)
    }

    /// Delete a newsletter; its subscriptions and replies cascade.
    pub async fn delete(&self, id: &NewsletterId) -> Result<(), Error> {
        let deleted = self
            .newsletters
            .delete(id)
            .await
            .map_err(map_newsletter_error)?;
        if !deleted {
            return Err(Error::not_found("newsletter not found"));
        }
        Ok(())
    }

    /// Fetch one newsletter with derived counts.
    pub async fn get(&self, id: &NewsletterId) -> Result<NewsletterOverview, Error> {
        let newsletter = self.require(id).await?;
        let subscriber_count = self
            .subscriptions
            .count_for_newsletter(id)
            .await
            .map_err(map_subscription_error)?;
        let reply_counts = self
            .replies
            .counts_for_newsletters(std::slice::from_ref(id))
            .await
            .map_err(map_reply_error)?;
        let reply_count = reply_counts
            .into_iter()
            .find_map(|(counted, count)| (counted == *id).then_some(count))
            .unwrap_or(0);
        Ok(NewsletterOverview {
            newsletter,
            subscriber_count,
            reply_count,
        })
    }

    /// List newsletters of any status with derived counts, newest first.
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<NewsletterOverview>, Error> {
        let newsletters = self
            .newsletters
            .list(limit)
            .await
            .map_err(map_newsletter_error)?;
        let ids: Vec<NewsletterId> = newsletters.iter().map(|n| *n.id()).collect();
        let subscriber_counts = self.subscriber_counts(&ids).await?;
        let reply_counts: HashMap<Uuid, u64> = self
            .replies
            .counts_for_newsletters(&ids)
            .await
            .map_err(map_reply_error)?
            .into_iter()
            .map(|(id, count)| (*id.as_uuid(), count))
            .collect();

        Ok(newsletters
            .into_iter()
            .map(|newsletter| {
                let key = *newsletter.id().as_uuid();
                NewsletterOverview {
                    subscriber_count: subscriber_counts.get(&key).copied().unwrap_or(0),
                    reply_count: reply_counts.get(&key).copied().unwrap_or(0),
                    newsletter,
                }
            })
            .collect())
    }

    /// List published newsletters for a subscriber, newest first, with the
    /// viewer's own subscription timestamps.
    pub async fn browse_published(
        &self,
        viewer: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<PublishedNewsletter>, Error> {
        let newsletters = self
            .newsletters
            .list_published(limit)
            .await
            .map_err(map_newsletter_error)?;
        let ids: Vec<NewsletterId> = newsletters.iter().map(|n| *n.id()).collect();
        let subscriber_counts = self.subscriber_counts(&ids).await?;
        let own_subscriptions: HashMap<Uuid, DateTime<Utc>> = self
            .subscriptions
            .list_for_user(viewer)
            .await
            .map_err(map_subscription_error)?
            .into_iter()
            .map(|view| {
                (
                    *view.subscription.newsletter_id.as_uuid(),
                    view.subscription.subscribed_at,
                )
            })
            .collect();

        Ok(newsletters
            .into_iter()
            .map(|newsletter| {
                let key = *newsletter.id().as_uuid();
                PublishedNewsletter {
                    subscriber_count: subscriber_counts.get(&key).copied().unwrap_or(0),
                    subscribed_at: own_subscriptions.get(&key).copied(),
                    newsletter,
                }
            })
            .collect())
    }

    async fn require(&self, id: &NewsletterId) -> Result<Newsletter, Error> {
        self.newsletters
            .find(id)
            .await
            .map_err(map_newsletter_error)?
            .ok_or_else(|| Error::not_found("newsletter not found"))
    }

    async fn subscriber_counts(
        &self,
        ids: &[NewsletterId],
    ) -> Result<HashMap<Uuid, u64>, Error> {
        Ok(self
            .subscriptions
            .counts_for_newsletters(ids)
            .await
            .map_err(map_subscription_error)?
            .into_iter()
            .map(|(id, count)| (*id.as_uuid(), count))
            .collect())
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

fn map_reply_error(error: ReplyStoreError) -> Error {
    match error {
        ReplyStoreError::Connection { message } => {
            Error::service_unavailable(format!("reply store unavailable: {message}"))
        }
        ReplyStoreError::Query { message } => {
            Error::internal(format!("reply store error: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MemoryNewsletterRepository, MemoryReplyRepository, MemorySubscriptionRepository,
        MemoryUserRepository,
    };
    use crate::domain::test_support::{fixture_clock, fixture_timestamp};
    use crate::domain::{
        Category, ErrorCode, NewsletterBody, NewsletterTitle, Subscription,
    };

    struct Fixture {
        service: NewsletterService,
        subscriptions: Arc<MemorySubscriptionRepository>,
    }

    fn fixture() -> Fixture {
        let newsletters = Arc::new(MemoryNewsletterRepository::new());
        let users = Arc::new(MemoryUserRepository::new());
        let subscriptions = Arc::new(MemorySubscriptionRepository::new(Arc::clone(&newsletters)));
        let replies = Arc::new(MemoryReplyRepository::new(
            Arc::clone(&newsletters),
            Arc::clone(&users),
        ));
        let service = NewsletterService::new(
            newsletters,
            Arc::clone(&subscriptions) as Arc<dyn SubscriptionRepository>,
            replies,
            fixture_clock(),
        );
        Fixture {
            service,
            subscriptions,
        }
    }

    fn draft(title: &str) -> NewsletterDraft {
        NewsletterDraft {
            title: NewsletterTitle::new(title).expect("valid title"),
            body: NewsletterBody::new("body").expect("valid body"),
            image_url: None,
            category: Category::default(),
        }
    }

    fn author() -> DisplayName {
        DisplayName::new("Editor").expect("valid name")
    }

    #[tokio::test]
    async fn publishing_sets_the_publication_timestamp() {
        let fx = fixture();
        let published = fx
            .service
            .create(draft("live"), author(), true)
            .await
            .expect("create");
        assert_eq!(published.published_at(), Some(fixture_timestamp()));

        let saved_draft = fx
            .service
            .create(draft("pending"), author(), false)
            .await
            .expect("create");
        assert_eq!(saved_draft.published_at(), None);
    }

    #[tokio::test]
    async fn republishing_preserves_the_first_publication_timestamp() {
        let fx = fixture();
        let published = fx
            .service
            .create(draft("live"), author(), true)
            .await
            .expect("create");

        let revised = fx
            .service
            .update(published.id(), draft("live, revised"), true)
            .await
            .expect("update");
        assert_eq!(revised.published_at(), published.published_at());
        assert_eq!(revised.title().as_ref(), "live, revised");
    }

    #[tokio::test]
    async fn updating_a_missing_newsletter_is_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .update(&NewsletterId::random(), draft("ghost"), false)
            .await
            .expect_err("missing newsletter");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn deleted_newsletters_disappear_from_listings() {
        let fx = fixture();
        let newsletter = fx
            .service
            .create(draft("short lived"), author(), true)
            .await
            .expect("create");
        assert_eq!(fx.service.list(None).await.expect("list").len(), 1);

        fx.service.delete(newsletter.id()).await.expect("delete");
        assert!(fx.service.list(None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn listings_carry_derived_subscriber_counts() {
        let fx = fixture();
        let newsletter = fx
            .service
            .create(draft("popular"), author(), true)
            .await
            .expect("create");
        for _ in 0..3 {
            fx.subscriptions
                .insert_if_absent(&Subscription {
                    user_id: UserId::random(),
                    newsletter_id: *newsletter.id(),
                    subscribed_at: fixture_timestamp(),
                })
                .await
                .expect("subscribe");
        }

        let listed = fx.service.list(None).await.expect("list");
        assert_eq!(listed.first().map(|o| o.subscriber_count), Some(3));
    }

    #[tokio::test]
    async fn browsing_flags_the_viewers_own_subscriptions() {
        let fx = fixture();
        let viewer = UserId::random();
        let subscribed = fx
            .service
            .create(draft("subscribed"), author(), true)
            .await
            .expect("create");
        let other = fx
            .service
            .create(draft("other"), author(), true)
            .await
            .expect("create");
        fx.subscriptions
            .insert_if_absent(&Subscription {
                user_id: viewer,
                newsletter_id: *subscribed.id(),
                subscribed_at: fixture_timestamp(),
            })
            .await
            .expect("subscribe");

        let browsed = fx
            .service
            .browse_published(&viewer, None)
            .await
            .expect("browse");
        let by_title = |title: &str| {
            browsed
                .iter()
                .find(|p| p.newsletter.title().as_ref() == title)
                .map(|p| p.subscribed_at)
        };
        assert_eq!(by_title("subscribed"), Some(Some(fixture_timestamp())));
        assert_eq!(by_title("other"), Some(None));
        let _ = other;
    }
}
