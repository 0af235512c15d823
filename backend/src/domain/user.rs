//! User account data model.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors raised by the account newtypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    /// The user id was empty.
    EmptyId,
    /// The user id was not a valid UUID.
    InvalidId,
    /// The email address was empty after trimming.
    EmptyEmail,
    /// The email address did not match the accepted shape.
    InvalidEmail,
    /// The email address exceeded the maximum length.
    EmailTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The display name was empty after trimming.
    EmptyDisplayName,
    /// The display name exceeded the maximum length.
    DisplayNameTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The role string named no known role.
    UnknownRole,
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyEmail => write!(f, "email address must not be empty"),
            Self::InvalidEmail => write!(f, "email address is not valid"),
            Self::EmailTooLong { max } => {
                write!(f, "email address must be at most {max} characters")
            }
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
            Self::DisplayNameTooLong { max } => {
                write!(f, "display name must be at most {max} characters")
            }
            Self::UnknownRole => write!(f, "role must be either \"user\" or \"admin\""),
        }
    }
}

impl std::error::Error for AccountValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, AccountValidationError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(AccountValidationError::EmptyId);
        }
        if raw.trim() != raw {
            return Err(AccountValidationError::InvalidId);
        }
        let parsed = Uuid::parse_str(raw).map_err(|_| AccountValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Wrap an already-parsed UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum accepted email address length.
pub const EMAIL_MAX: usize = 254;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        // Deliberately permissive: one @, no whitespace, a dot in the domain.
        let pattern = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`] from owned input.
    pub fn new(email: impl Into<String>) -> Result<Self, AccountValidationError> {
        let email = email.into();
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(AccountValidationError::EmptyEmail);
        }
        if trimmed.chars().count() > EMAIL_MAX {
            return Err(AccountValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        if !email_regex().is_match(trimmed) {
            return Err(AccountValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum accepted display name length.
pub const DISPLAY_NAME_MAX: usize = 64;

/// Human readable display name for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`] from owned input.
    pub fn new(display_name: impl Into<String>) -> Result<Self, AccountValidationError> {
        let display_name = display_name.into();
        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(AccountValidationError::EmptyDisplayName);
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX {
            return Err(AccountValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Access role attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Subscriber access: browse, subscribe, reply.
    User,
    /// Content and management access.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Role {
    type Err = AccountValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(AccountValidationError::UnknownRole),
        }
    }
}

/// A registered account.
///
/// ## Invariants
/// - `email` is unique across accounts (enforced by the store).
/// - `role` is a closed enum; unknown roles are rejected at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    id: UserId,
    email: EmailAddress,
    display_name: DisplayName,
    role: Role,
    disabled: bool,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Assemble an account from validated parts.
    pub const fn new(
        id: UserId,
        email: EmailAddress,
        display_name: DisplayName,
        role: Role,
        disabled: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            display_name,
            role,
            disabled,
            created_at,
        }
    }

    /// Stable identifier.
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Account email address.
    pub const fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Display name shown in the UI and on authored newsletters.
    pub const fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    /// Access role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether an administrator has disabled this account.
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Creation timestamp, used by sign-up growth windows.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replace the display name.
    pub fn with_display_name(mut self, display_name: DisplayName) -> Self {
        self.display_name = display_name;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("reader@example.com", true)]
    #[case("Reader@Example.COM", true)]
    #[case("two words@example.com", false)]
    #[case("no-at-sign.example.com", false)]
    #[case("missing@tld", false)]
    #[case("   ", false)]
    fn email_validation(#[case] input: &str, #[case] accepted: bool) {
        assert_eq!(EmailAddress::new(input).is_ok(), accepted);
    }

    #[test]
    fn email_is_normalized_to_lowercase() {
        let email = EmailAddress::new("Reader@Example.COM").expect("valid email");
        assert_eq!(email.as_ref(), "reader@example.com");
    }

    #[rstest]
    #[case("user", Ok(Role::User))]
    #[case("admin", Ok(Role::Admin))]
    #[case("owner", Err(AccountValidationError::UnknownRole))]
    fn role_parsing(#[case] input: &str, #[case] expected: Result<Role, AccountValidationError>) {
        assert_eq!(input.parse::<Role>(), expected);
    }

    #[test]
    fn user_id_rejects_non_uuid_input() {
        assert_eq!(
            UserId::new("not-a-uuid"),
            Err(AccountValidationError::InvalidId)
        );
    }

    #[test]
    fn user_id_round_trips_through_string() {
        let id = UserId::random();
        let raw = String::from(id);
        assert_eq!(UserId::new(&raw), Ok(id));
    }

    #[test]
    fn display_name_is_trimmed() {
        let name = DisplayName::new("  Ada Lovelace  ").expect("valid name");
        assert_eq!(name.as_ref(), "Ada Lovelace");
    }

    #[test]
    fn display_name_rejects_overlong_input() {
        let long = "x".repeat(DISPLAY_NAME_MAX + 1);
        assert_eq!(
            DisplayName::new(long),
            Err(AccountValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX
            })
        );
    }
}
