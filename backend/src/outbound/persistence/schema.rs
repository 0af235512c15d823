//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are
//! used by Diesel for compile-time query validation and type-safe SQL
//! generation. Regenerate with `diesel print-schema` after a migration
//! changes the schema.

diesel::table! {
    /// Registered accounts.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique email address, stored lowercase.
        email -> Varchar,
        /// Human-readable display name.
        display_name -> Varchar,
        /// Access role: `user` or `admin`.
        role -> Varchar,
        /// Whether an administrator disabled the account.
        disabled -> Bool,
        /// Sign-up timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp (auto-updated by trigger).
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Newsletter issues. Counts are never stored here; they are derived
    /// from `subscriptions` and `replies`.
    newsletters (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Issue title.
        title -> Varchar,
        /// Issue body text.
        content -> Text,
        /// Hosted hero image URL.
        image_url -> Nullable<Varchar>,
        /// Editorial category.
        category -> Varchar,
        /// Authoring administrator's display name.
        author -> Varchar,
        /// Publication status: `draft` or `published`.
        status -> Varchar,
        /// Publication timestamp; set exactly when status is `published`.
        published_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp (auto-updated by trigger).
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Subscriber replies to newsletter issues.
    replies (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Addressed newsletter (cascade on delete).
        newsletter_id -> Uuid,
        /// Sending account (cascade on delete).
        sender_id -> Uuid,
        /// Message text, at most 1000 characters.
        message -> Text,
        /// Whether an administrator marked the reply read.
        read -> Bool,
        /// Submission timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// The canonical user-to-newsletter subscription relation.
    subscriptions (user_id, newsletter_id) {
        /// Subscribing account (cascade on delete).
        user_id -> Uuid,
        /// Newsletter opted into (cascade on delete).
        newsletter_id -> Uuid,
        /// Opt-in timestamp, the unsubscribe-cooldown anchor.
        subscribed_at -> Timestamptz,
    }
}

diesel::joinable!(replies -> newsletters (newsletter_id));
diesel::joinable!(replies -> users (sender_id));
diesel::joinable!(subscriptions -> newsletters (newsletter_id));
diesel::joinable!(subscriptions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, newsletters, replies, subscriptions);
