//! OpenAPI documentation configuration.
//!
//! Registers every REST endpoint and its request/response schemas, plus
//! the session cookie security scheme. Swagger UI serves the generated
//! document in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::auth::{
    LoginRequest, MeResponse, ResetPasswordRequest, SignupRequest, VerifyRequest,
};
use crate::inbound::http::dashboard::{DashboardResponse, LastPublishedResponse};
use crate::inbound::http::images::ImageUploadResponse;
use crate::inbound::http::newsletters::{
    NewsletterOverviewResponse, NewsletterResponse, PublishedNewsletterResponse,
    SaveNewsletterRequest,
};
use crate::inbound::http::replies::{
    ReplyInboxResponse, ReplyResponse, SubmitReplyRequest,
};
use crate::inbound::http::subscriptions::SubscriptionResponse;
use crate::inbound::http::users::{
    SetDisabledRequest, SubscriberResponse, UpdateSettingsRequest,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/auth/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "NewsEcho backend API",
        description = "HTTP interface for the NewsEcho newsletter platform."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::signup,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::verify,
        crate::inbound::http::auth::reset_password,
        crate::inbound::http::auth::me,
        crate::inbound::http::newsletters::create_newsletter,
        crate::inbound::http::newsletters::list_newsletters,
        crate::inbound::http::newsletters::get_newsletter,
        crate::inbound::http::newsletters::update_newsletter,
        crate::inbound::http::newsletters::delete_newsletter,
        crate::inbound::http::newsletters::browse_newsletters,
        crate::inbound::http::subscriptions::subscribe,
        crate::inbound::http::subscriptions::unsubscribe,
        crate::inbound::http::subscriptions::list_subscriptions,
        crate::inbound::http::replies::submit_reply,
        crate::inbound::http::replies::list_own_replies,
        crate::inbound::http::replies::list_replies,
        crate::inbound::http::replies::mark_reply_read,
        crate::inbound::http::dashboard::dashboard,
        crate::inbound::http::users::list_subscribers,
        crate::inbound::http::users::set_user_disabled,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::users::get_settings,
        crate::inbound::http::users::update_settings,
        crate::inbound::http::images::upload_image,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        SignupRequest,
        LoginRequest,
        VerifyRequest,
        ResetPasswordRequest,
        MeResponse,
        SaveNewsletterRequest,
        NewsletterResponse,
        NewsletterOverviewResponse,
        PublishedNewsletterResponse,
        SubscriptionResponse,
        SubmitReplyRequest,
        ReplyResponse,
        ReplyInboxResponse,
        DashboardResponse,
        LastPublishedResponse,
        SubscriberResponse,
        SetDisabledRequest,
        UpdateSettingsRequest,
        ImageUploadResponse,
    )),
    tags(
        (name = "auth", description = "Registration, sessions, and verification"),
        (name = "newsletters", description = "Authoring and browsing newsletters"),
        (name = "subscriptions", description = "Subscription lifecycle"),
        (name = "replies", description = "Reply submission and moderation"),
        (name = "dashboard", description = "Admin aggregation"),
        (name = "users", description = "User administration and settings"),
        (name = "images", description = "Hero image hosting"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
