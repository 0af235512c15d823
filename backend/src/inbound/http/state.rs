//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::ImageStore;
use crate::domain::{
    AccountService, DashboardService, NewsletterService, ReplyService, SubscriptionService,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Auth and user administration.
    pub accounts: AccountService,
    /// Newsletter authoring and browsing.
    pub newsletters: NewsletterService,
    /// Subscription lifecycle.
    pub subscriptions: SubscriptionService,
    /// Reply submission and moderation.
    pub replies: ReplyService,
    /// Dashboard aggregation.
    pub dashboard: DashboardService,
    /// Image host adapter.
    pub images: Arc<dyn ImageStore>,
}

impl HttpState {
    /// Bundle the given services.
    pub fn new(
        accounts: AccountService,
        newsletters: NewsletterService,
        subscriptions: SubscriptionService,
        replies: ReplyService,
        dashboard: DashboardService,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            accounts,
            newsletters,
            subscriptions,
            replies,
            dashboard,
            images,
        }
    }
}
