//! PostgreSQL-backed `NewsletterRepository` implementation using Diesel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{NewsletterRepository, NewsletterStoreError};
use crate::domain::{Newsletter, NewsletterId};

use super::diesel_error_mapping::{count_to_u64, map_diesel_error, map_pool_error};
use super::models::{NewNewsletterRow, NewsletterRow, row_to_newsletter};
use super::pool::DbPool;
use super::schema::newsletters;

/// Diesel-backed implementation of the `NewsletterRepository` port.
#[derive(Clone)]
pub struct DieselNewsletterRepository {
    pool: DbPool,
}

impl DieselNewsletterRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: diesel::result::Error) -> NewsletterStoreError {
    map_diesel_error(
        error,
        NewsletterStoreError::query,
        NewsletterStoreError::connection,
    )
}

fn boundary_error(message: String) -> NewsletterStoreError {
    NewsletterStoreError::query(message)
}

fn rows_to_newsletters(rows: Vec<NewsletterRow>) -> Result<Vec<Newsletter>, NewsletterStoreError> {
    rows.into_iter()
        .map(|row| row_to_newsletter(row).map_err(boundary_error))
        .collect()
}

#[async_trait]
impl NewsletterRepository for DieselNewsletterRepository {
    async fn insert(&self, newsletter: &Newsletter) -> Result<(), NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        diesel::insert_into(newsletters::table)
            .values(NewNewsletterRow::from_newsletter(newsletter))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn update(&self, newsletter: &Newsletter) -> Result<bool, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let status = newsletter.status().to_string();
        let updated = diesel::update(
            newsletters::table.filter(newsletters::id.eq(newsletter.id().as_uuid())),
        )
        .set((
            newsletters::title.eq(newsletter.title().as_ref()),
            newsletters::content.eq(newsletter.body().as_ref()),
            newsletters::image_url.eq(newsletter.image_url()),
            newsletters::category.eq(newsletter.category().as_ref()),
            newsletters::status.eq(status),
            newsletters::published_at.eq(newsletter.published_at()),
        ))
        .execute(&mut conn)
        .await
        .map_err(store_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: &NewsletterId) -> Result<bool, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let deleted = diesel::delete(newsletters::table.filter(newsletters::id.eq(id.as_uuid())))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(deleted > 0)
    }

    async fn find(&self, id: &NewsletterId) -> Result<Option<Newsletter>, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let row: Option<NewsletterRow> = newsletters::table
            .filter(newsletters::id.eq(id.as_uuid()))
            .select(NewsletterRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;

        row.map(|found| row_to_newsletter(found).map_err(boundary_error))
            .transpose()
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<Newsletter>, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let mut query = newsletters::table
            .order(newsletters::created_at.desc())
            .select(NewsletterRow::as_select())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(i64::from(limit));
        }
        let rows = query.load(&mut conn).await.map_err(store_error)?;
        rows_to_newsletters(rows)
    }

    async fn list_published(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<Newsletter>, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let mut query = newsletters::table
            .filter(newsletters::status.eq("published"))
            .order(newsletters::created_at.desc())
            .select(NewsletterRow::as_select())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(i64::from(limit));
        }
        let rows = query.load(&mut conn).await.map_err(store_error)?;
        rows_to_newsletters(rows)
    }

    async fn last_published(&self) -> Result<Option<Newsletter>, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let row: Option<NewsletterRow> = newsletters::table
            .filter(newsletters::status.eq("published"))
            .filter(newsletters::published_at.is_not_null())
            .order(newsletters::published_at.desc())
            .select(NewsletterRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;

        row.map(|found| row_to_newsletter(found).map_err(boundary_error))
            .transpose()
    }

    async fn count(&self) -> Result<u64, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let count: i64 = newsletters::table
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
    ) -> Result<u64, NewsletterStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NewsletterStoreError::connection))?;

        let count: i64 = newsletters::table
            .filter(newsletters::created_at.ge(from))
            .filter(newsletters::created_at.lt(to))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count_to_u64(count))
    }
}
