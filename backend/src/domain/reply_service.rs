//! Reply submission and moderation service.

use std::sync::Arc;

use mockable::Clock;

use super::ports::{
    NewsletterRepository, NewsletterStoreError, ReplyRepository, ReplyStoreError,
    SubscriptionRepository, SubscriptionStoreError,
};
use super::{Error, NewsletterId, ReadFilter, Reply, ReplyId, ReplyMessage, ReplyView, UserId};

/// Admin inbox page: replies plus the live unread count.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyInbox {
    /// Replies matching the requested filter, newest first.
    pub replies: Vec<ReplyView>,
    /// Replies not yet marked read, regardless of filter.
    pub unread: u64,
}

/// Reply submission and moderation service.
#[derive(Clone)]
pub struct ReplyService {
    replies: Arc<dyn ReplyRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    newsletters: Arc<dyn NewsletterRepository>,
    clock: Arc<dyn Clock>,
}

impl ReplyService {
    /// Create a new service with the given repositories.
    pub fn new(
        replies: Arc<dyn ReplyRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        newsletters: Arc<dyn NewsletterRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            replies,
            subscriptions,
            newsletters,
            clock,
        }
    }

    /// Submit a reply to a newsletter the sender is subscribed to.
    pub async fn submit(
        &self,
        sender_id: &UserId,
        newsletter_id: &NewsletterId,
        message: ReplyMessage,
    ) -> Result<Reply, Error> {
        self.newsletters
            .find(newsletter_id)
            .await
            .map_err(map_newsletter_error)?
            .ok_or_else(|| Error::not_found("newsletter not found"))?;

        let subscribed = self
            .subscriptions
            .find(sender_id, newsletter_id)
            .await
            .map_err(map_subscription_error)?
            .is_some();
        if !subscribed {
            return Err(Error::forbidden(
                "subscribe to this newsletter before replying",
            ));
        }

        let reply = Reply::new(
            ReplyId::random(),
            *newsletter_id,
            *sender_id,
            message,
            false,
            self.clock.utc(),
        );
        self.replies
            .insert(&reply)
            .await
            .map_err(map_reply_error)?;
        Ok(reply)
    }

    /// Admin inbox with read-state filtering and the unread count.
    pub async fn inbox(
        &self,
        filter: ReadFilter,
        limit: Option<u32>,
    ) -> Result<ReplyInbox, Error> {
        let replies = self
            .replies
            .list(filter, limit)
            .await
            .map_err(map_reply_error)?;
        let unread = self.replies.count_unread().await.map_err(map_reply_error)?;
        Ok(ReplyInbox { replies, unread })
    }

    /// Mark a reply as read.
    pub async fn mark_read(&self, id: &ReplyId) -> Result<(), Error> {
        let marked = self.replies.mark_read(id).await.map_err(map_reply_error)?;
        if !marked {
            return Err(Error::not_found("reply not found"));
        }
        Ok(())
    }

    /// List one sender's own replies.
    pub async fn list_for_sender(&self, sender_id: &UserId) -> Result<Vec<ReplyView>, Error> {
        self.replies
            .list_for_sender(sender_id)
            .await
            .map_err(map_reply_error)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MemoryNewsletterRepository, MemoryReplyRepository, MemorySubscriptionRepository,
        MemoryUserRepository, UserRepository,
    };
    use crate::domain::test_support::{fixture_clock, fixture_timestamp};
    use crate::domain::{
        Account, Category, DisplayName, EmailAddress, ErrorCode, Newsletter, NewsletterBody,
        NewsletterDraft, NewsletterStatus, NewsletterTitle, Role, Subscription,
    };

    struct Fixture {
        service: ReplyService,
        subscriptions: Arc<MemorySubscriptionRepository>,
        newsletter: Newsletter,
        sender: Account,
    }

    async fn fixture() -> Fixture {
        let newsletters = Arc::new(MemoryNewsletterRepository::new());
        let users = Arc::new(MemoryUserRepository::new());
        let subscriptions = Arc::new(MemorySubscriptionRepository::new(Arc::clone(&newsletters)));
        let replies = Arc::new(MemoryReplyRepository::new(
            Arc::clone(&newsletters),
            Arc::clone(&users),
        ));

        let newsletter = Newsletter::new(
            NewsletterId::random(),
            NewsletterDraft {
                title: NewsletterTitle::new("Weekly Digest").expect("valid title"),
                body: NewsletterBody::new("body").expect("valid body"),
                image_url: None,
                category: Category::default(),
            },
            DisplayName::new("Editor").expect("valid name"),
            NewsletterStatus::Published,
            Some(fixture_timestamp()),
            fixture_timestamp(),
        );
        newsletters
            .insert(&newsletter)
            .await
            .expect("insert newsletter");

        let sender = Account::new(
            UserId::random(),
            EmailAddress::new("reader@example.com").expect("valid email"),
            DisplayName::new("Reader").expect("valid name"),
            Role::User,
            false,
            fixture_timestamp(),
        );
        users.insert_if_absent(&sender).await.expect("insert user");

        let service = ReplyService::new(
            replies,
            Arc::clone(&subscriptions) as Arc<dyn SubscriptionRepository>,
            newsletters,
            fixture_clock(),
        );
        Fixture {
            service,
            subscriptions,
            newsletter,
            sender,
        }
    }

    async fn subscribe(fx: &Fixture) {
        fx.subscriptions
            .insert_if_absent(&Subscription {
                user_id: *fx.sender.id(),
                newsletter_id: *fx.newsletter.id(),
                subscribed_at: fixture_timestamp(),
            })
            .await
            .expect("subscribe");
    }

    fn message(text: &str) -> ReplyMessage {
        ReplyMessage::new(text).expect("valid message")
    }

    #[tokio::test]
    async fn subscribers_can_reply() {
        let fx = fixture().await;
        subscribe(&fx).await;

        let reply = fx
            .service
            .submit(fx.sender.id(), fx.newsletter.id(), message("Great issue"))
            .await
            .expect("submit");
        assert!(!reply.is_read());

        let inbox = fx
            .service
            .inbox(ReadFilter::All, None)
            .await
            .expect("inbox");
        assert_eq!(inbox.replies.len(), 1);
        assert_eq!(inbox.unread, 1);
    }

    #[tokio::test]
    async fn non_subscribers_are_forbidden() {
        let fx = fixture().await;

        let err = fx
            .service
            .submit(fx.sender.id(), fx.newsletter.id(), message("Hello"))
            .await
            .expect_err("must be subscribed");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn replying_to_a_missing_newsletter_is_not_found() {
        let fx = fixture().await;

        let err = fx
            .service
            .submit(fx.sender.id(), &NewsletterId::random(), message("Hello"))
            .await
            .expect_err("missing newsletter");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn marking_read_clears_the_unread_count() {
        let fx = fixture().await;
        subscribe(&fx).await;
        let reply = fx
            .service
            .submit(fx.sender.id(), fx.newsletter.id(), message("Great issue"))
            .await
            .expect("submit");

        fx.service.mark_read(reply.id()).await.expect("mark read");
        let inbox = fx
            .service
            .inbox(ReadFilter::Unread, None)
            .await
            .expect("inbox");
        assert!(inbox.replies.is_empty());
        assert_eq!(inbox.unread, 0);
    }

    #[tokio::test]
    async fn marking_a_missing_reply_is_not_found() {
        let fx = fixture().await;
        let err = fx
            .service
            .mark_read(&ReplyId::random())
            .await
            .expect_err("missing reply");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
