//! Port abstraction for reply persistence adapters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{NewsletterId, ReadFilter, Reply, ReplyId, ReplyView, UserId};

use super::define_port_error;
use super::newsletter_repository::{MemoryNewsletterRepository, NewsletterRepository};
use super::user_repository::{MemoryUserRepository, UserRepository};

define_port_error! {
    /// Persistence errors raised by reply store adapters.
    pub enum ReplyStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "reply store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "reply store query failed: {message}",
    }
}

/// Driven port for reply persistence.
///
/// List views join the newsletter title and sender identity at read time;
/// nothing is copied at write time, so titles cannot go stale.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplyRepository: Send + Sync {
    /// Persist a new reply.
    async fn insert(&self, reply: &Reply) -> Result<(), ReplyStoreError>;

    /// Mark a reply as read; `false` when no row matched. Marking an
    /// already-read reply is a no-op reported as `true`.
    async fn mark_read(&self, id: &ReplyId) -> Result<bool, ReplyStoreError>;

    /// List replies newest first, filtered by read state.
    async fn list(
        &self,
        filter: ReadFilter,
        limit: Option<u32>,
    ) -> Result<Vec<ReplyView>, ReplyStoreError>;

    /// List one sender's replies newest first.
    async fn list_for_sender(&self, sender_id: &UserId)
    -> Result<Vec<ReplyView>, ReplyStoreError>;

    /// Total number of replies.
    async fn count(&self) -> Result<u64, ReplyStoreError>;

    /// Number of replies not yet marked read.
    async fn count_unread(&self) -> Result<u64, ReplyStoreError>;

    /// Number of replies created in `[from, to)`.
    async fn count_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, ReplyStoreError>;

    /// Reply counts for a batch of newsletters. Newsletters with no
    /// replies may be absent from the result.
    async fn counts_for_newsletters(
        &self,
        newsletter_ids: &[NewsletterId],
    ) -> Result<Vec<(NewsletterId, u64)>, ReplyStoreError>;

    /// Submission timestamps of replies created at or after `since`,
    /// for engagement bucketing.
    async fn created_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, ReplyStoreError>;
}

/// In-memory reply store used when no database is configured and by
/// handler tests. Joins against the shared in-memory newsletter and
/// account stores.
pub struct MemoryReplyRepository {
    newsletters: Arc<MemoryNewsletterRepository>,
    users: Arc<MemoryUserRepository>,
    state: Mutex<HashMap<Uuid, Reply>>,
}

impl MemoryReplyRepository {
    /// Create an empty store joining against the given stores.
    pub fn new(
        newsletters: Arc<MemoryNewsletterRepository>,
        users: Arc<MemoryUserRepository>,
    ) -> Self {
        Self {
            newsletters,
            users,
            state: Mutex::new(HashMap::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<Uuid, Reply>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn join(&self, replies: Vec<Reply>) -> Result<Vec<ReplyView>, ReplyStoreError> {
        let mut views = Vec::with_capacity(replies.len());
        for reply in replies {
            let newsletter = self
                .newsletters
                .find(reply.newsletter_id())
                .await
                .map_err(|err| ReplyStoreError::query(err.to_string()))?;
            let sender = self
                .users
                .find(reply.sender_id())
                .await
                .map_err(|err| ReplyStoreError::query(err.to_string()))?;
            // Rows orphaned by a newsletter or account delete are skipped,
            // matching the cascade the relational adapter gets for free.
            if let (Some(newsletter), Some(sender)) = (newsletter, sender) {
                views.push(ReplyView {
                    reply,
                    newsletter_title: newsletter.title().clone(),
                    sender_name: sender.display_name().clone(),
                    sender_email: sender.email().clone(),
                });
            }
        }
        Ok(views)
    }

    fn sorted(mut replies: Vec<Reply>, limit: Option<u32>) -> Vec<Reply> {
        replies.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        match limit {
            Some(limit) => replies.into_iter().take(limit as usize).collect(),
            None => replies,
        }
    }
}

#[async_trait]
impl ReplyRepository for MemoryReplyRepository {
    async fn insert(&self, reply: &Reply) -> Result<(), ReplyStoreError> {
        self.guard().insert(*reply.id().as_uuid(), reply.clone());
        Ok(())
    }

    async fn mark_read(&self, id: &ReplyId) -> Result<bool, ReplyStoreError> {
        let mut state = self.guard();
        match state.get_mut(id.as_uuid()) {
            Some(reply) => {
                *reply = Reply::new(
                    *reply.id(),
                    *reply.newsletter_id(),
                    *reply.sender_id(),
                    reply.message().clone(),
                    true,
                    reply.created_at(),
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(
        &self,
        filter: ReadFilter,
        limit: Option<u32>,
    ) -> Result<Vec<ReplyView>, ReplyStoreError> {
        let replies: Vec<Reply> = self
            .guard()
            .values()
            .filter(|reply| filter.matches(reply.is_read()))
            .cloned()
            .collect();
        self.join(Self::sorted(replies, limit)).await
    }

    async fn list_for_sender(
        &self,
        sender_id: &UserId,
    ) -> Result<Vec<ReplyView>, ReplyStoreError> {
        let replies: Vec<Reply> = self
            .guard()
            .values()
            .filter(|reply| reply.sender_id() == sender_id)
            .cloned()
            .collect();
        self.join(Self::sorted(replies, None)).await
    }

    async fn count(&self) -> Result<u64, ReplyStoreError> {
        Ok(self.guard().len() as u64)
    }

    async fn count_unread(&self) -> Result<u64, ReplyStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|reply| !reply.is_read())
            .count() as u64)
    }

    async fn count_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, ReplyStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|reply| reply.created_at() >= from && reply.created_at() < to)
            .count() as u64)
    }

    async fn counts_for_newsletters(
        &self,
        newsletter_ids: &[NewsletterId],
    ) -> Result<Vec<(NewsletterId, u64)>, ReplyStoreError> {
        let state = self.guard();
        let mut counts = Vec::with_capacity(newsletter_ids.len());
        for id in newsletter_ids {
            let count = state
                .values()
                .filter(|reply| reply.newsletter_id() == id)
                .count() as u64;
            if count > 0 {
                counts.push((*id, count));
            }
        }
        Ok(counts)
    }

    async fn created_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, ReplyStoreError> {
        Ok(self
            .guard()
            .values()
            .filter(|reply| reply.created_at() >= since)
            .map(Reply::created_at)
            .collect())
    }
}
