//! Domain types, services, and ports.
//!
//! Entities are validated once, at construction, into invariant-respecting
//! newtypes; adapters never re-guess defaults at read sites. Services
//! depend only on the ports in [`ports`], so every domain rule is testable
//! without I/O.

pub mod error;
pub mod newsletter;
pub mod ports;
pub mod reply;
pub mod stats;
pub mod subscription;
pub mod user;

mod account_service;
mod dashboard_service;
mod newsletter_service;
mod reply_service;
mod subscription_service;

pub use self::account_service::AccountService;
pub use self::dashboard_service::DashboardService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::newsletter::{
    Category, Newsletter, NewsletterBody, NewsletterDraft, NewsletterId, NewsletterStatus,
    NewsletterTitle, NewsletterValidationError,
};
pub use self::newsletter_service::{NewsletterOverview, NewsletterService, PublishedNewsletter};
pub use self::reply::{
    ReadFilter, Reply, ReplyId, ReplyMessage, ReplyValidationError, ReplyView, REPLY_MESSAGE_MAX,
};
pub use self::reply_service::{ReplyInbox, ReplyService};
pub use self::stats::{growth_percent, DashboardSnapshot, EngagementSeries, ENGAGEMENT_DAYS};
pub use self::subscription::{Subscription, UNSUBSCRIBE_COOLDOWN_HOURS};
pub use self::subscription_service::SubscriptionService;
pub use self::user::{
    Account, AccountValidationError, DisplayName, EmailAddress, Role, UserId, DISPLAY_NAME_MAX,
    EMAIL_MAX,
};

/// Convenient domain result alias.
pub type DomainResult<T> = Result<T, Error>;
