//! Diesel row structs and their conversions into domain types.
//!
//! Conversion happens exactly once, here, at the store boundary. A row
//! that fails validation surfaces as a query error instead of being
//! patched over with read-site defaults.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Account, Category, DisplayName, EmailAddress, Newsletter, NewsletterBody, NewsletterDraft,
    NewsletterId, NewsletterStatus, NewsletterTitle, Reply, ReplyId, ReplyMessage, Role, UserId,
};

use super::schema::{newsletters, replies, subscriptions, users};

/// Queryable row for accounts.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable row for accounts.
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub display_name: &'a str,
    pub role: &'a str,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewUserRow<'a> {
    pub(crate) fn from_account(account: &'a Account) -> Self {
        Self {
            id: *account.id().as_uuid(),
            email: account.email().as_ref(),
            display_name: account.display_name().as_ref(),
            role: match account.role() {
                Role::User => "user",
                Role::Admin => "admin",
            },
            disabled: account.is_disabled(),
            created_at: account.created_at(),
        }
    }
}

pub(crate) fn row_to_account(row: UserRow) -> Result<Account, String> {
    let email = EmailAddress::new(&row.email)
        .map_err(|err| format!("account {} has invalid email: {err}", row.id))?;
    let display_name = DisplayName::new(&row.display_name)
        .map_err(|err| format!("account {} has invalid display name: {err}", row.id))?;
    let role = row
        .role
        .parse::<Role>()
        .map_err(|err| format!("account {} has invalid role: {err}", row.id))?;
    Ok(Account::new(
        UserId::from_uuid(row.id),
        email,
        display_name,
        role,
        row.disabled,
        row.created_at,
    ))
}

/// Queryable row for newsletters.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = newsletters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NewsletterRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category: String,
    pub author: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insertable row for newsletters.
#[derive(Debug, Insertable)]
#[diesel(table_name = newsletters)]
pub(crate) struct NewNewsletterRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub content: &'a str,
    pub image_url: Option<&'a str>,
    pub category: &'a str,
    pub author: &'a str,
    pub status: &'a str,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewNewsletterRow<'a> {
    pub(crate) fn from_newsletter(newsletter: &'a Newsletter) -> Self {
        Self {
            id: *newsletter.id().as_uuid(),
            title: newsletter.title().as_ref(),
            content: newsletter.body().as_ref(),
            image_url: newsletter.image_url(),
            category: newsletter.category().as_ref(),
            author: newsletter.author().as_ref(),
            status: match newsletter.status() {
                NewsletterStatus::Draft => "draft",
                NewsletterStatus::Published => "published",
            },
            published_at: newsletter.published_at(),
            created_at: newsletter.created_at(),
        }
    }
}

pub(crate) fn row_to_newsletter(row: NewsletterRow) -> Result<Newsletter, String> {
    let title = NewsletterTitle::new(&row.title)
        .map_err(|err| format!("newsletter {} has invalid title: {err}", row.id))?;
    let body = NewsletterBody::new(&row.content)
        .map_err(|err| format!("newsletter {} has invalid content: {err}", row.id))?;
    let category = Category::new(&row.category)
        .map_err(|err| format!("newsletter {} has invalid category: {err}", row.id))?;
    let author = DisplayName::new(&row.author)
        .map_err(|err| format!("newsletter {} has invalid author: {err}", row.id))?;
    let status = row
        .status
        .parse::<NewsletterStatus>()
        .map_err(|err| format!("newsletter {} has invalid status: {err}", row.id))?;
    Ok(Newsletter::new(
        NewsletterId::from_uuid(row.id),
        NewsletterDraft {
            title,
            body,
            image_url: row.image_url,
            category,
        },
        author,
        status,
        row.published_at,
        row.created_at,
    ))
}

/// Queryable row for replies.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = replies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReplyRow {
    pub id: Uuid,
    pub newsletter_id: Uuid,
    pub sender_id: Uuid,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable row for replies.
#[derive(Debug, Insertable)]
#[diesel(table_name = replies)]
pub(crate) struct NewReplyRow<'a> {
    pub id: Uuid,
    pub newsletter_id: Uuid,
    pub sender_id: Uuid,
    pub message: &'a str,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewReplyRow<'a> {
    pub(crate) fn from_reply(reply: &'a Reply) -> Self {
        Self {
            id: *reply.id().as_uuid(),
            newsletter_id: *reply.newsletter_id().as_uuid(),
            sender_id: *reply.sender_id().as_uuid(),
            message: reply.message().as_ref(),
            read: reply.is_read(),
            created_at: reply.created_at(),
        }
    }
}

pub(crate) fn row_to_reply(row: ReplyRow) -> Result<Reply, String> {
    let message = ReplyMessage::new(&row.message)
        .map_err(|err| format!("reply {} has invalid message: {err}", row.id))?;
    Ok(Reply::new(
        ReplyId::from_uuid(row.id),
        NewsletterId::from_uuid(row.newsletter_id),
        UserId::from_uuid(row.sender_id),
        message,
        row.read,
        row.created_at,
    ))
}

/// Queryable row for subscriptions.
#[derive(Debug, Clone, Copy, Queryable, Selectable, Insertable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SubscriptionRow {
    pub user_id: Uuid,
    pub newsletter_id: Uuid,
    pub subscribed_at: DateTime<Utc>,
}
