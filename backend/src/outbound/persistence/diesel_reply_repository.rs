//! PostgreSQL-backed `ReplyRepository` implementation using Diesel.
//!
//! List queries join the newsletter title and sender identity in SQL;
//! nothing is denormalized onto the reply row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{ReplyRepository, ReplyStoreError};
use crate::domain::{
    DisplayName, EmailAddress, NewsletterId, NewsletterTitle, ReadFilter, Reply, ReplyId,
    ReplyView, UserId,
};

use super::diesel_error_mapping::{count_to_u64, map_diesel_error, map_pool_error};
use super::models::{NewReplyRow, ReplyRow, row_to_reply};
use super::pool::DbPool;
use super::schema::{newsletters, replies, users};

/// Diesel-backed implementation of the `ReplyRepository` port.
#[derive(Clone)]
pub struct DieselReplyRepository {
    pool: DbPool,
}

impl DieselReplyRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: diesel::result::Error) -> ReplyStoreError {
    map_diesel_error(error, ReplyStoreError::query, ReplyStoreError::connection)
}

fn boundary_error(message: String) -> ReplyStoreError {
    ReplyStoreError::query(message)
}

type JoinedRow = (ReplyRow, String, String, String);

fn joined_to_view(joined: JoinedRow) -> Result<ReplyView, ReplyStoreError> {
    let (row, title, sender_name, sender_email) = joined;
    let reply = row_to_reply(row).map_err(boundary_error)?;
    Ok(ReplyView {
        newsletter_title: NewsletterTitle::new(title)
            .map_err(|err| boundary_error(format!("joined title invalid: {err}")))?,
        sender_name: DisplayName::new(sender_name)
            .map_err(|err| boundary_error(format!("joined sender name invalid: {err}")))?,
        sender_email: EmailAddress::new(sender_email)
            .map_err(|err| boundary_error(format!("joined sender email invalid: {err}")))?,
        reply,
    })
}

#[async_trait]
impl ReplyRepository for DieselReplyRepository {
    async fn insert(&self, reply: &Reply) -> Result<(), ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        diesel::insert_into(replies::table)
            .values(NewReplyRow::from_reply(reply))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn mark_read(&self, id: &ReplyId) -> Result<bool, ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        let updated = diesel::update(replies::table.filter(replies::id.eq(id.as_uuid())))
            .set(replies::read.eq(true))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(updated > 0)
    }

    async fn list(
        &self,
        filter: ReadFilter,
        limit: Option<u32>,
    ) -> Result<Vec<ReplyView>, ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        let mut query = replies::table
            .inner_join(newsletters::table)
            .inner_join(users::table)
            .order(replies::created_at.desc())
            .select((
                ReplyRow::as_select(),
                newsletters::title,
                users::display_name,
                users::email,
            ))
            .into_boxed();
        query = match filter {
            ReadFilter::All => query,
            ReadFilter::Read => query.filter(replies::read.eq(true)),
            ReadFilter::Unread => query.filter(replies::read.eq(false)),
        };
        if let Some(limit) = limit {
            query = query.limit(i64::from(limit));
        }

        let rows: Vec<JoinedRow> = query.load(&mut conn).await.map_err(store_error)?;
        rows.into_iter().map(joined_to_view).collect()
    }

    async fn list_for_sender(
        &self,
        sender_id: &UserId,
    ) -> Result<Vec<ReplyView>, ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        let rows: Vec<JoinedRow> = replies::table
            .inner_join(newsletters::table)
            .inner_join(users::table)
            .filter(replies::sender_id.eq(sender_id.as_uuid()))
            .order(replies::created_at.desc())
            .select((
                ReplyRow::as_select(),
                newsletters::title,
                users::display_name,
                users::email,
            ))
            .load(&mut conn)
            .await
            .map_err(store_error)?;
        rows.into_iter().map(joined_to_view).collect()
    }

    async fn count(&self) -> Result<u64, ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        let count: i64 = replies::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count_to_u64(count))
    }

    async fn count_unread(&self) -> Result<u64, ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        let count: i64 = replies::table
            .filter(replies::read.eq(false))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count_to_u64(count))
    }

    async fn count_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        let count: i64 = replies::table
            .filter(replies::created_at.ge(from))
            .filter(replies::created_at.lt(to))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count_to_u64(count))
    }

    async fn counts_for_newsletters(
        &self,
        newsletter_ids: &[NewsletterId],
    ) -> Result<Vec<(NewsletterId, u64)>, ReplyStoreError> {
        if newsletter_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        let uuids: Vec<Uuid> = newsletter_ids.iter().map(|id| *id.as_uuid()).collect();
        let counts: Vec<(Uuid, i64)> = replies::table
            .filter(replies::newsletter_id.eq_any(uuids))
            .group_by(replies::newsletter_id)
            .select((replies::newsletter_id, diesel::dsl::count_star()))
            .load(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(counts
            .into_iter()
            .map(|(id, count)| (NewsletterId::from_uuid(id), count_to_u64(count)))
            .collect())
    }

    async fn created_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, ReplyStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ReplyStoreError::connection))?;

        replies::table
            .filter(replies::created_at.ge(since))
            .select(replies::created_at)
            .load(&mut conn)
            .await
            .map_err(store_error)
    }
}
