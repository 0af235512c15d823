//! Admin dashboard aggregation service.
//!
//! Every figure is computed from the source relations on each call.
//! Growth windows are the trailing 7 days against the 7 days before
//! that.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;

use super::ports::{
    NewsletterRepository, NewsletterStoreError, ReplyRepository, ReplyStoreError, UserRepository,
    UserStoreError,
};
use super::stats::{DashboardSnapshot, EngagementSeries, growth_percent};
use super::Error;

/// Number of recent newsletters surfaced on the dashboard.
const RECENT_NEWSLETTERS: u32 = 3;

/// Length of the growth comparison windows, in days.
const WINDOW_DAYS: i64 = 7;

/// Admin dashboard aggregation service.
#[derive(Clone)]
pub struct DashboardService {
    newsletters: Arc<dyn NewsletterRepository>,
    users: Arc<dyn UserRepository>,
    replies: Arc<dyn ReplyRepository>,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    /// Create a new service with the given repositories.
    pub fn new(
        newsletters: Arc<dyn NewsletterRepository>,
        users: Arc<dyn UserRepository>,
        replies: Arc<dyn ReplyRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            newsletters,
            users,
            replies,
            clock,
        }
    }

    /// Compute the full dashboard in one pass.
    pub async fn snapshot(&self) -> Result<DashboardSnapshot, Error> {
        let now = self.clock.utc();
        let window_start = now - Duration::days(WINDOW_DAYS);
        let previous_start = now - Duration::days(2 * WINDOW_DAYS);

        let total_newsletters = self
            .newsletters
            .count()
            .await
            .map_err(map_newsletter_error)?;
        let current_newsletters = self
            .newsletters
            .count_created_between(window_start, now)
            .await
            .map_err(map_newsletter_error)?;
        let previous_newsletters = self
            .newsletters
            .count_created_between(previous_start, window_start)
            .await
            .map_err(map_newsletter_error)?;

        let active_subscribers = self
            .users
            .count_active_subscribers()
            .await
            .map_err(map_user_error)?;
        let current_subscribers = self
            .users
            .count_subscribers_created_between(window_start, now)
            .await
            .map_err(map_user_error)?;
        let previous_subscribers = self
            .users
            .count_subscribers_created_between(previous_start, window_start)
            .await
            .map_err(map_user_error)?;

        let total_replies = self.replies.count().await.map_err(map_reply_error)?;
        let current_replies = self
            .replies
            .count_created_between(window_start, now)
            .await
            .map_err(map_reply_error)?;
        let previous_replies = self
            .replies
            .count_created_between(previous_start, window_start)
            .await
            .map_err(map_reply_error)?;

        let last_published = self
            .newsletters
            .last_published()
            .await
            .map_err(map_newsletter_error)?;
        let recent = self
            .newsletters
            .list(Some(RECENT_NEWSLETTERS))
            .await
            .map_err(map_newsletter_error)?;

        let reply_stamps = self
            .replies
            .created_since(window_start)
            .await
            .map_err(map_reply_error)?;
        let engagement = EngagementSeries::from_timestamps(now, &reply_stamps);
        let engagement_growth = engagement.growth();

        Ok(DashboardSnapshot {
            total_newsletters,
            newsletter_growth: growth_percent(previous_newsletters, current_newsletters),
            active_subscribers,
            subscriber_growth: growth_percent(previous_subscribers, current_subscribers),
            total_replies,
            reply_growth: growth_percent(previous_replies, current_replies),
            last_published,
            recent,
            engagement,
            engagement_growth,
        })
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

fn map_user_error(error: UserStoreError) -> Error {
    match error {
        UserStoreError::Connection { message } => {
            Error::service_unavailable(format!("account store unavailable: {message}"))
        }
        UserStoreError::Query { message } => {
            Error::internal(format!("account store error: {message}"))
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
        MemoryNewsletterRepository, MemoryReplyRepository, MemoryUserRepository, UserRepository,
    };
    use crate::domain::test_support::{fixture_clock, fixture_timestamp};
    use crate::domain::{
        Account, Category, DisplayName, EmailAddress, Newsletter, NewsletterBody, NewsletterDraft,
        NewsletterId, NewsletterStatus, NewsletterTitle, Reply, ReplyId, ReplyMessage, Role,
        UserId,
    };
    use chrono::{DateTime, Utc};

    struct Fixture {
        service: DashboardService,
        newsletters: Arc<MemoryNewsletterRepository>,
        users: Arc<MemoryUserRepository>,
        replies: Arc<MemoryReplyRepository>,
    }

    fn fixture() -> Fixture {
        let newsletters = Arc::new(MemoryNewsletterRepository::new());
        let users = Arc::new(MemoryUserRepository::new());
        let replies = Arc::new(MemoryReplyRepository::new(
            Arc::clone(&newsletters),
            Arc::clone(&users),
        ));
        let service = DashboardService::new(
            Arc::clone(&newsletters) as Arc<dyn NewsletterRepository>,
            Arc::clone(&users) as Arc<dyn UserRepository>,
            Arc::clone(&replies) as Arc<dyn ReplyRepository>,
            fixture_clock(),
        );
        Fixture {
            service,
            newsletters,
            users,
            replies,
        }
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        fixture_timestamp() - Duration::days(days)
    }

    async fn seed_newsletter(fx: &Fixture, title: &str, created_at: DateTime<Utc>) -> Newsletter {
        let newsletter = Newsletter::new(
            NewsletterId::random(),
            NewsletterDraft {
                title: NewsletterTitle::new(title).expect("valid title"),
                body: NewsletterBody::new("body").expect("valid body"),
                image_url: None,
                category: Category::default(),
            },
            DisplayName::new("Editor").expect("valid name"),
            NewsletterStatus::Published,
            Some(created_at),
            created_at,
        );
        fx.newsletters
            .insert(&newsletter)
            .await
            .expect("insert newsletter");
        newsletter
    }

    async fn seed_subscriber(fx: &Fixture, email: &str, created_at: DateTime<Utc>) -> Account {
        let account = Account::new(
            UserId::random(),
            EmailAddress::new(email).expect("valid email"),
            DisplayName::new("Reader").expect("valid name"),
            Role::User,
            false,
            created_at,
        );
        fx.users
            .insert_if_absent(&account)
            .await
            .expect("insert user");
        account
    }

    async fn seed_reply(
        fx: &Fixture,
        newsletter: &Newsletter,
        sender: &Account,
        created_at: DateTime<Utc>,
    ) {
        fx.replies
            .insert(&Reply::new(
                ReplyId::random(),
                *newsletter.id(),
                *sender.id(),
                ReplyMessage::new("Nice one").expect("valid message"),
                false,
                created_at,
            ))
            .await
            .expect("insert reply");
    }

    #[tokio::test]
    async fn empty_platform_reports_zero_growth_everywhere() {
        let fx = fixture();
        let snapshot = fx.service.snapshot().await.expect("snapshot");

        assert_eq!(snapshot.total_newsletters, 0);
        assert_eq!(snapshot.newsletter_growth, 0.0);
        assert_eq!(snapshot.active_subscribers, 0);
        assert_eq!(snapshot.subscriber_growth, 0.0);
        assert_eq!(snapshot.total_replies, 0);
        assert_eq!(snapshot.reply_growth, 0.0);
        assert_eq!(snapshot.last_published, None);
        assert!(snapshot.recent.is_empty());
        assert_eq!(snapshot.engagement_growth, 0.0);
    }

    #[tokio::test]
    async fn first_window_activity_reports_full_growth() {
        let fx = fixture();
        seed_newsletter(&fx, "first", days_ago(2)).await;
        seed_subscriber(&fx, "reader@example.com", days_ago(1)).await;

        let snapshot = fx.service.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.newsletter_growth, 100.0);
        assert_eq!(snapshot.subscriber_growth, 100.0);
    }

    #[tokio::test]
    async fn growth_compares_adjacent_windows() {
        let fx = fixture();
        // Previous window: two issues. Current window: three issues.
        for day in [9, 8] {
            seed_newsletter(&fx, &format!("old {day}"), days_ago(day)).await;
        }
        for day in [5, 3, 1] {
            seed_newsletter(&fx, &format!("new {day}"), days_ago(day)).await;
        }

        let snapshot = fx.service.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.total_newsletters, 5);
        assert_eq!(snapshot.newsletter_growth, 50.0);
    }

    #[tokio::test]
    async fn recent_list_is_capped_at_three() {
        let fx = fixture();
        for day in 1..=5 {
            seed_newsletter(&fx, &format!("issue {day}"), days_ago(day)).await;
        }

        let snapshot = fx.service.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.recent.len(), 3);
        assert_eq!(
            snapshot.recent.first().map(|n| n.title().as_ref()),
            Some("issue 1")
        );
    }

    #[tokio::test]
    async fn engagement_buckets_replies_by_day() {
        let fx = fixture();
        let newsletter = seed_newsletter(&fx, "issue", days_ago(6)).await;
        let reader = seed_subscriber(&fx, "reader@example.com", days_ago(6)).await;
        seed_reply(&fx, &newsletter, &reader, days_ago(6)).await;
        seed_reply(&fx, &newsletter, &reader, days_ago(0)).await;
        seed_reply(&fx, &newsletter, &reader, days_ago(0)).await;

        let snapshot = fx.service.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.engagement.buckets(), &[1, 0, 0, 0, 0, 0, 2]);
        assert_eq!(snapshot.engagement_growth, 100.0);
        assert_eq!(snapshot.total_replies, 3);
    }
}
