//! PostgreSQL-backed `SubscriptionRepository` implementation using Diesel.
//!
//! The subscription relation is the single source of truth for subscriber
//! counts; inserts go through `ON CONFLICT DO NOTHING` so re-subscribing
//! never moves the cooldown anchor.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{SubscriptionRepository, SubscriptionStoreError, SubscriptionView};
use crate::domain::{NewsletterId, Subscription, UserId};

use super::diesel_error_mapping::{count_to_u64, map_diesel_error, map_pool_error};
use super::models::{NewsletterRow, SubscriptionRow, row_to_newsletter};
use super::pool::DbPool;
use super::schema::{newsletters, subscriptions};

/// Diesel-backed implementation of the `SubscriptionRepository` port.
#[derive(Clone)]
pub struct DieselSubscriptionRepository {
    pool: DbPool,
}

impl DieselSubscriptionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: diesel::result::Error) -> SubscriptionStoreError {
    map_diesel_error(
        error,
        SubscriptionStoreError::query,
        SubscriptionStoreError::connection,
    )
}

fn row_to_subscription(row: SubscriptionRow) -> Subscription {
    Subscription {
        user_id: UserId::from_uuid(row.user_id),
        newsletter_id: NewsletterId::from_uuid(row.newsletter_id),
        subscribed_at: row.subscribed_at,
    }
}

#[async_trait]
impl SubscriptionRepository for DieselSubscriptionRepository {
    async fn insert_if_absent(
        &self,
        subscription: &Subscription,
    ) -> Result<bool, SubscriptionStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SubscriptionStoreError::connection))?;

        let row = SubscriptionRow {
            user_id: *subscription.user_id.as_uuid(),
            newsletter_id: *subscription.newsletter_id.as_uuid(),
            subscribed_at: subscription.subscribed_at,
        };
        let inserted = diesel::insert_into(subscriptions::table)
            .values(row)
            .on_conflict((subscriptions::user_id, subscriptions::newsletter_id))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(inserted > 0)
    }

    async fn delete(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<bool, SubscriptionStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SubscriptionStoreError::connection))?;

        let deleted = diesel::delete(
            subscriptions::table
                .filter(subscriptions::user_id.eq(user_id.as_uuid()))
                .filter(subscriptions::newsletter_id.eq(newsletter_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(store_error)?;
        Ok(deleted > 0)
    }

    async fn find(
        &self,
        user_id: &UserId,
        newsletter_id: &NewsletterId,
    ) -> Result<Option<Subscription>, SubscriptionStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SubscriptionStoreError::connection))?;

        let row: Option<SubscriptionRow> = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id.as_uuid()))
            .filter(subscriptions::newsletter_id.eq(newsletter_id.as_uuid()))
            .select(SubscriptionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        Ok(row.map(row_to_subscription))
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionView>, SubscriptionStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SubscriptionStoreError::connection))?;

        let rows: Vec<(SubscriptionRow, NewsletterRow)> = subscriptions::table
            .inner_join(newsletters::table)
            .filter(subscriptions::user_id.eq(user_id.as_uuid()))
            .order(subscriptions::subscribed_at.desc())
            .select((SubscriptionRow::as_select(), NewsletterRow::as_select()))
            .load(&mut conn)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .map(|(subscription_row, newsletter_row)| {
                let newsletter = row_to_newsletter(newsletter_row)
                    .map_err(SubscriptionStoreError::query)?;
                Ok(SubscriptionView {
                    subscription: row_to_subscription(subscription_row),
                    newsletter,
                })
            })
            .collect()
    }

    async fn count_for_newsletter(
        &self,
        newsletter_id: &NewsletterId,
    ) -> Result<u64, SubscriptionStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SubscriptionStoreError::connection))?;

        let count: i64 = subscriptions::table
            .filter(subscriptions::newsletter_id.eq(newsletter_id.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count_to_u64(count))
    }

    async fn counts_for_newsletters(
        &self,
        newsletter_ids: &[NewsletterId],
    ) -> Result<Vec<(NewsletterId, u64)>, SubscriptionStoreError> {
        if newsletter_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SubscriptionStoreError::connection))?;

        let uuids: Vec<Uuid> = newsletter_ids.iter().map(|id| *id.as_uuid()).collect();
        let counts: Vec<(Uuid, i64)> = subscriptions::table
            .filter(subscriptions::newsletter_id.eq_any(uuids))
            .group_by(subscriptions::newsletter_id)
            .select((subscriptions::newsletter_id, diesel::dsl::count_star()))
            .load(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(counts
            .into_iter()
            .map(|(id, count)| (NewsletterId::from_uuid(id), count_to_u64(count)))
            .collect())
    }
}
