//! PostgreSQL persistence adapters implementing the domain store ports.

mod diesel_error_mapping;
mod diesel_newsletter_repository;
mod diesel_reply_repository;
mod diesel_subscription_repository;
mod diesel_user_repository;
mod models;
mod pool;
pub mod schema;

pub use diesel_newsletter_repository::DieselNewsletterRepository;
pub use diesel_reply_repository::DieselReplyRepository;
pub use diesel_subscription_repository::DieselSubscriptionRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
