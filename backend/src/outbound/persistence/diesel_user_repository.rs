//! PostgreSQL-backed `UserRepository` implementation using Diesel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserRepository, UserStoreError};
use crate::domain::{Account, DisplayName, EmailAddress, UserId};

use super::diesel_error_mapping::{count_to_u64, map_diesel_error, map_pool_error};
use super::models::{NewUserRow, UserRow, row_to_account};
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: diesel::result::Error) -> UserStoreError {
    map_diesel_error(error, UserStoreError::query, UserStoreError::connection)
}

fn boundary_error(message: String) -> UserStoreError {
    UserStoreError::query(message)
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find(&self, id: &UserId) -> Result<Option<Account>, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;

        row.map(|found| row_to_account(found).map_err(boundary_error))
            .transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Account>, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;

        row.map(|found| row_to_account(found).map_err(boundary_error))
            .transpose()
    }

    async fn insert_if_absent(&self, account: &Account) -> Result<Account, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        diesel::insert_into(users::table)
            .values(NewUserRow::from_account(account))
            .on_conflict(users::email)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(store_error)?;

        // Re-read by email so a concurrent insert's row wins consistently.
        let row: UserRow = users::table
            .filter(users::email.eq(account.email().as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .map_err(store_error)?;
        row_to_account(row).map_err(boundary_error)
    }

    async fn update_display_name(
        &self,
        id: &UserId,
        display_name: &DisplayName,
    ) -> Result<bool, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let updated = diesel::update(users::table.filter(users::id.eq(id.as_uuid())))
            .set(users::display_name.eq(display_name.as_ref()))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(updated > 0)
    }

    async fn set_disabled(&self, id: &UserId, disabled: bool) -> Result<bool, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let updated = diesel::update(users::table.filter(users::id.eq(id.as_uuid())))
            .set(users::disabled.eq(disabled))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let deleted = diesel::delete(users::table.filter(users::id.eq(id.as_uuid())))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(deleted > 0)
    }

    async fn list_subscribers(&self) -> Result<Vec<Account>, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let rows: Vec<UserRow> = users::table
            .filter(users::role.eq("user"))
            .order(users::created_at.desc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .map(|row| row_to_account(row).map_err(boundary_error))
            .collect()
    }

    async fn count_active_subscribers(&self) -> Result<u64, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let count: i64 = users::table
            .filter(users::role.eq("user"))
            .filter(users::disabled.eq(false))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count_to_u64(count))
    }

    async fn count_subscribers_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, UserStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, UserStoreError::connection))?;

        let count: i64 = users::table
            .filter(users::role.eq("user"))
            .filter(users::created_at.ge(from))
            .filter(users::created_at.lt(to))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count_to_u64(count))
    }
}
