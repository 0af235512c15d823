//! Reply data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::newsletter::{NewsletterId, NewsletterTitle};
use super::user::{DisplayName, EmailAddress, UserId};

/// Maximum accepted reply length in characters.
pub const REPLY_MESSAGE_MAX: usize = 1000;

/// Validation errors raised by the reply newtypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyValidationError {
    /// The message was empty after trimming.
    EmptyMessage,
    /// The message exceeded [`REPLY_MESSAGE_MAX`] characters.
    MessageTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The read filter string named no known filter.
    UnknownFilter,
}

impl fmt::Display for ReplyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "reply message must not be empty"),
            Self::MessageTooLong { max } => {
                write!(f, "reply message must be at most {max} characters")
            }
            Self::UnknownFilter => {
                write!(f, "filter must be one of \"all\", \"read\", or \"unread\"")
            }
        }
    }
}

impl std::error::Error for ReplyValidationError {}

/// Stable reply identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyId(Uuid);

impl ReplyId {
    /// Wrap an already-parsed UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new random [`ReplyId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ReplyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated reply message, 1..=1000 characters after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReplyMessage(String);

impl ReplyMessage {
    /// Validate and construct a [`ReplyMessage`] from owned input.
    pub fn new(message: impl Into<String>) -> Result<Self, ReplyValidationError> {
        let message = message.into();
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(ReplyValidationError::EmptyMessage);
        }
        if trimmed.chars().count() > REPLY_MESSAGE_MAX {
            return Err(ReplyValidationError::MessageTooLong {
                max: REPLY_MESSAGE_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for ReplyMessage {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<ReplyMessage> for String {
    fn from(value: ReplyMessage) -> Self {
        value.0
    }
}

impl TryFrom<String> for ReplyMessage {
    type Error = ReplyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A subscriber reply to a newsletter issue.
///
/// ## Invariants
/// - `newsletter_id` and `sender_id` reference live rows; the newsletter
///   title is joined at read time rather than copied, so it cannot go
///   stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    id: ReplyId,
    newsletter_id: NewsletterId,
    sender_id: UserId,
    message: ReplyMessage,
    read: bool,
    created_at: DateTime<Utc>,
}

impl Reply {
    /// Assemble a reply from validated parts.
    pub const fn new(
        id: ReplyId,
        newsletter_id: NewsletterId,
        sender_id: UserId,
        message: ReplyMessage,
        read: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            newsletter_id,
            sender_id,
            message,
            read,
            created_at,
        }
    }

    /// Stable identifier.
    pub const fn id(&self) -> &ReplyId {
        &self.id
    }

    /// Newsletter this reply addresses.
    pub const fn newsletter_id(&self) -> &NewsletterId {
        &self.newsletter_id
    }

    /// Account that sent the reply.
    pub const fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    /// Message text.
    pub const fn message(&self) -> &ReplyMessage {
        &self.message
    }

    /// Whether an administrator has marked the reply as read.
    pub const fn is_read(&self) -> bool {
        self.read
    }

    /// Submission timestamp.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Reply joined with its newsletter title and sender identity for list
/// views.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyView {
    /// The reply itself.
    pub reply: Reply,
    /// Title of the addressed newsletter, joined at read time.
    pub newsletter_title: NewsletterTitle,
    /// Sender display name, joined at read time.
    pub sender_name: DisplayName,
    /// Sender email, joined at read time.
    pub sender_email: EmailAddress,
}

/// Read-state filter for administrator reply listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFilter {
    /// Every reply.
    #[default]
    All,
    /// Replies already marked as read.
    Read,
    /// Replies not yet marked as read.
    Unread,
}

impl ReadFilter {
    /// Whether a reply with the given read flag passes the filter.
    pub const fn matches(self, read: bool) -> bool {
        match self {
            Self::All => true,
            Self::Read => read,
            Self::Unread => !read,
        }
    }
}

impl FromStr for ReadFilter {
    type Err = ReplyValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "read" => Ok(Self::Read),
            "unread" => Ok(Self::Unread),
            _ => Err(ReplyValidationError::UnknownFilter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn message_at_limit_is_accepted() {
        let message = "x".repeat(REPLY_MESSAGE_MAX);
        assert!(ReplyMessage::new(message).is_ok());
    }

    #[test]
    fn message_over_limit_is_rejected() {
        let message = "x".repeat(REPLY_MESSAGE_MAX + 1);
        assert_eq!(
            ReplyMessage::new(message),
            Err(ReplyValidationError::MessageTooLong {
                max: REPLY_MESSAGE_MAX
            })
        );
    }

    #[rstest]
    #[case("")]
    #[case("   \n\t")]
    fn blank_message_is_rejected(#[case] input: &str) {
        assert_eq!(
            ReplyMessage::new(input),
            Err(ReplyValidationError::EmptyMessage)
        );
    }

    #[rstest]
    #[case(ReadFilter::All, true, true)]
    #[case(ReadFilter::All, false, true)]
    #[case(ReadFilter::Read, true, true)]
    #[case(ReadFilter::Read, false, false)]
    #[case(ReadFilter::Unread, false, true)]
    #[case(ReadFilter::Unread, true, false)]
    fn filter_matching(#[case] filter: ReadFilter, #[case] read: bool, #[case] expected: bool) {
        assert_eq!(filter.matches(read), expected);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        assert_eq!(
            "starred".parse::<ReadFilter>(),
            Err(ReplyValidationError::UnknownFilter)
        );
    }
}
