//! Newsletter data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::DisplayName;

/// Validation errors raised by the newsletter newtypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsletterValidationError {
    /// The title was empty after trimming.
    EmptyTitle,
    /// The title exceeded the maximum length.
    TitleTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The body was empty after trimming.
    EmptyBody,
    /// The category was empty after trimming.
    EmptyCategory,
    /// The category exceeded the maximum length.
    CategoryTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The status string named no known status.
    UnknownStatus,
}

impl fmt::Display for NewsletterValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::TitleTooLong { max } => write!(f, "title must be at most {max} characters"),
            Self::EmptyBody => write!(f, "content must not be empty"),
            Self::EmptyCategory => write!(f, "category must not be empty"),
            Self::CategoryTooLong { max } => {
                write!(f, "category must be at most {max} characters")
            }
            Self::UnknownStatus => {
                write!(f, "status must be either \"draft\" or \"published\"")
            }
        }
    }
}

impl std::error::Error for NewsletterValidationError {}

/// Stable newsletter identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewsletterId(Uuid);

impl NewsletterId {
    /// Wrap an already-parsed UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new random [`NewsletterId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for NewsletterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum accepted title length.
pub const TITLE_MAX: usize = 200;

/// Validated newsletter title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NewsletterTitle(String);

impl NewsletterTitle {
    /// Validate and construct a [`NewsletterTitle`] from owned input.
    pub fn new(title: impl Into<String>) -> Result<Self, NewsletterValidationError> {
        let title = title.into();
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(NewsletterValidationError::EmptyTitle);
        }
        if trimmed.chars().count() > TITLE_MAX {
            return Err(NewsletterValidationError::TitleTooLong { max: TITLE_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for NewsletterTitle {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NewsletterTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<NewsletterTitle> for String {
    fn from(value: NewsletterTitle) -> Self {
        value.0
    }
}

impl TryFrom<String> for NewsletterTitle {
    type Error = NewsletterValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Validated newsletter body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NewsletterBody(String);

impl NewsletterBody {
    /// Validate and construct a [`NewsletterBody`] from owned input.
    pub fn new(body: impl Into<String>) -> Result<Self, NewsletterValidationError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(NewsletterValidationError::EmptyBody);
        }
        Ok(Self(body.trim().to_owned()))
    }
}

impl AsRef<str> for NewsletterBody {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NewsletterBody> for String {
    fn from(value: NewsletterBody) -> Self {
        value.0
    }
}

impl TryFrom<String> for NewsletterBody {
    type Error = NewsletterValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum accepted category length.
pub const CATEGORY_MAX: usize = 64;

/// Editorial category label.
///
/// A missing or blank category normalizes to [`Category::default`] at the
/// boundary, so read paths never invent a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Validate and construct a [`Category`] from owned input.
    pub fn new(category: impl Into<String>) -> Result<Self, NewsletterValidationError> {
        let category = category.into();
        let trimmed = category.trim();
        if trimmed.is_empty() {
            return Err(NewsletterValidationError::EmptyCategory);
        }
        if trimmed.chars().count() > CATEGORY_MAX {
            return Err(NewsletterValidationError::CategoryTooLong { max: CATEGORY_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl Default for Category {
    fn default() -> Self {
        Self("General".to_owned())
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.0
    }
}

impl TryFrom<String> for Category {
    type Error = NewsletterValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsletterStatus {
    /// Visible only to administrators.
    Draft,
    /// Visible to subscribers.
    Published,
}

impl fmt::Display for NewsletterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => f.write_str("draft"),
            Self::Published => f.write_str("published"),
        }
    }
}

impl FromStr for NewsletterStatus {
    type Err = NewsletterValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(NewsletterValidationError::UnknownStatus),
        }
    }
}

/// A newsletter issue.
///
/// ## Invariants
/// - `published_at` is `Some` exactly when `status` is
///   [`NewsletterStatus::Published`].
/// - Subscriber and reply counts are never stored here; they are derived
///   from the subscription and reply relations at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct Newsletter {
    id: NewsletterId,
    title: NewsletterTitle,
    body: NewsletterBody,
    image_url: Option<String>,
    category: Category,
    author: DisplayName,
    status: NewsletterStatus,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Newsletter {
    /// Assemble a newsletter from validated parts.
    ///
    /// `published_at` is forced to agree with `status`: drafts carry no
    /// publication timestamp.
    pub fn new(
        id: NewsletterId,
        draft: NewsletterDraft,
        author: DisplayName,
        status: NewsletterStatus,
        published_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let published_at = match status {
            NewsletterStatus::Published => published_at,
            NewsletterStatus::Draft => None,
        };
        Self {
            id,
            title: draft.title,
            body: draft.body,
            image_url: draft.image_url,
            category: draft.category,
            author,
            status,
            published_at,
            created_at,
        }
    }

    /// Stable identifier.
    pub const fn id(&self) -> &NewsletterId {
        &self.id
    }

    /// Issue title.
    pub const fn title(&self) -> &NewsletterTitle {
        &self.title
    }

    /// Issue body text.
    pub const fn body(&self) -> &NewsletterBody {
        &self.body
    }

    /// Hosted hero image, when one was uploaded.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Editorial category.
    pub const fn category(&self) -> &Category {
        &self.category
    }

    /// Display name of the authoring administrator.
    pub const fn author(&self) -> &DisplayName {
        &self.author
    }

    /// Publication status.
    pub const fn status(&self) -> NewsletterStatus {
        self.status
    }

    /// Publication timestamp; `Some` iff the issue is published.
    pub const fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// Creation timestamp, used by growth windows.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Validated input for creating or revising a newsletter.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsletterDraft {
    /// Issue title.
    pub title: NewsletterTitle,
    /// Issue body text.
    pub body: NewsletterBody,
    /// Hosted hero image URL, when already uploaded.
    pub image_url: Option<String>,
    /// Editorial category.
    pub category: Category,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn draft(title: &str, body: &str) -> Result<NewsletterDraft, NewsletterValidationError> {
        Ok(NewsletterDraft {
            title: NewsletterTitle::new(title)?,
            body: NewsletterBody::new(body)?,
            image_url: None,
            category: Category::default(),
        })
    }

    #[rstest]
    #[case("", "body", NewsletterValidationError::EmptyTitle)]
    #[case("   ", "body", NewsletterValidationError::EmptyTitle)]
    #[case("title", "", NewsletterValidationError::EmptyBody)]
    #[case("title", " \n ", NewsletterValidationError::EmptyBody)]
    fn blank_title_or_body_is_rejected(
        #[case] title: &str,
        #[case] body: &str,
        #[case] expected: NewsletterValidationError,
    ) {
        assert_eq!(draft(title, body).unwrap_err(), expected);
    }

    #[test]
    fn title_is_trimmed() {
        let title = NewsletterTitle::new("  Weekly Digest  ").expect("valid title");
        assert_eq!(title.as_ref(), "Weekly Digest");
    }

    #[test]
    fn default_category_is_general() {
        assert_eq!(Category::default().as_ref(), "General");
    }

    #[rstest]
    #[case(NewsletterStatus::Draft, "draft")]
    #[case(NewsletterStatus::Published, "published")]
    fn status_round_trips_through_str(#[case] status: NewsletterStatus, #[case] raw: &str) {
        assert_eq!(status.to_string(), raw);
        assert_eq!(raw.parse::<NewsletterStatus>(), Ok(status));
    }

    #[test]
    fn draft_status_clears_published_at() {
        let parts = draft("Weekly Digest", "Hello, readers.").expect("valid draft");
        let now = chrono::Utc::now();
        let newsletter = Newsletter::new(
            NewsletterId::random(),
            parts,
            crate::domain::DisplayName::new("Editor").expect("valid name"),
            NewsletterStatus::Draft,
            Some(now),
            now,
        );
        assert_eq!(newsletter.published_at(), None);
    }
}
