//! Reply API handlers.
//!
//! ```text
//! POST /api/v1/newsletters/{id}/replies {"message":"..."}
//! GET  /api/v1/replies                          (caller's own)
//! GET  /api/v1/admin/replies?filter=unread&limit=50
//! POST /api/v1/admin/replies/{id}/read
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    Error, NewsletterId, ReadFilter, ReplyId, ReplyMessage, ReplyValidationError, ReplyView,
};

use super::ApiResult;
use super::session::SessionContext;
use super::state::HttpState;

/// Reply submission body.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReplyRequest {
    /// Message text, 1..=1000 characters after trimming.
    pub message: String,
}

/// Reply listing item.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    /// Identifier.
    pub id: Uuid,
    /// Addressed newsletter.
    pub newsletter_id: Uuid,
    /// Newsletter title, joined at read time.
    pub newsletter_title: String,
    /// Sender display name.
    pub sender_name: String,
    /// Sender email.
    pub sender_email: String,
    /// Message text.
    pub message: String,
    /// Whether an administrator marked the reply read.
    pub read: bool,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&ReplyView> for ReplyResponse {
    fn from(view: &ReplyView) -> Self {
        Self {
            id: *view.reply.id().as_uuid(),
            newsletter_id: *view.reply.newsletter_id().as_uuid(),
            newsletter_title: view.newsletter_title.to_string(),
            sender_name: view.sender_name.to_string(),
            sender_email: view.sender_email.to_string(),
            message: view.reply.message().as_ref().to_owned(),
            read: view.reply.is_read(),
            created_at: view.reply.created_at(),
        }
    }
}

/// Admin inbox response.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyInboxResponse {
    /// Replies matching the filter, newest first.
    pub replies: Vec<ReplyResponse>,
    /// Unread count regardless of filter.
    pub unread: u64,
}

/// Admin inbox query parameters.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct InboxQuery {
    /// `all`, `read`, or `unread`; defaults to `all`.
    pub filter: Option<String>,
    /// Cap on the number of returned replies.
    pub limit: Option<u32>,
}

fn map_reply_validation_error(err: ReplyValidationError) -> Error {
    let (field, code) = match &err {
        ReplyValidationError::EmptyMessage => ("message", "empty_message"),
        ReplyValidationError::MessageTooLong { .. } => ("message", "message_too_long"),
        ReplyValidationError::UnknownFilter => ("filter", "unknown_filter"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

/// Submit a reply to a subscribed newsletter.
#[utoipa::path(
    post,
    path = "/api/v1/newsletters/{id}/replies",
    request_body = SubmitReplyRequest,
    params(("id" = Uuid, Path, description = "Newsletter identifier")),
    responses(
        (status = 201, description = "Reply stored", body = ReplyResponse),
        (status = 400, description = "Invalid message", body = crate::domain::Error),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 403, description = "Not subscribed", body = crate::domain::Error),
        (status = 404, description = "Unknown newsletter", body = crate::domain::Error)
    ),
    tags = ["replies"],
    operation_id = "submitReply"
)]
#[post("/newsletters/{id}/replies")]
pub async fn submit_reply(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<SubmitReplyRequest>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let id = NewsletterId::from_uuid(path.into_inner());
    let message =
        ReplyMessage::new(&payload.message).map_err(map_reply_validation_error)?;
    let reply = state.replies.submit(&user.user_id, &id, message).await?;
    let account = state.accounts.current(&user.user_id).await?;
    let view = ReplyView {
        newsletter_title: state.newsletters.get(&id).await?.newsletter.title().clone(),
        sender_name: account.display_name().clone(),
        sender_email: account.email().clone(),
        reply,
    };
    Ok(HttpResponse::Created().json(ReplyResponse::from(&view)))
}

/// List the caller's own replies.
#[utoipa::path(
    get,
    path = "/api/v1/replies",
    responses(
        (status = 200, description = "Own replies", body = [ReplyResponse]),
        (status = 401, description = "Not logged in", body = crate::domain::Error)
    ),
    tags = ["replies"],
    operation_id = "listOwnReplies"
)]
#[get("/replies")]
pub async fn list_own_replies(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ReplyResponse>>> {
    let user = session.require_user()?;
    let views = state.replies.list_for_sender(&user.user_id).await?;
    Ok(web::Json(views.iter().map(ReplyResponse::from).collect()))
}

/// Admin inbox with read-state filtering.
#[utoipa::path(
    get,
    path = "/api/v1/admin/replies",
    params(InboxQuery),
    responses(
        (status = 200, description = "Inbox", body = ReplyInboxResponse),
        (status = 400, description = "Invalid filter", body = crate::domain::Error),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 403, description = "Not an administrator", body = crate::domain::Error)
    ),
    tags = ["replies"],
    operation_id = "listReplies"
)]
#[get("/admin/replies")]
pub async fn list_replies(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<InboxQuery>,
) -> ApiResult<web::Json<ReplyInboxResponse>> {
    session.require_admin()?;
    let filter = match query.filter.as_deref() {
        None => ReadFilter::All,
        Some(raw) => raw
            .parse::<ReadFilter>()
            .map_err(map_reply_validation_error)?,
    };
    let inbox = state.replies.inbox(filter, query.limit).await?;
    Ok(web::Json(ReplyInboxResponse {
        replies: inbox.replies.iter().map(ReplyResponse::from).collect(),
        unread: inbox.unread,
    }))
}

/// Mark a reply as read.
#[utoipa::path(
    post,
    path = "/api/v1/admin/replies/{id}/read",
    params(("id" = Uuid, Path, description = "Reply identifier")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Unknown reply", body = crate::domain::Error)
    ),
    tags = ["replies"],
    operation_id = "markReplyRead"
)]
#[post("/admin/replies/{id}/read")]
pub async fn mark_reply_read(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let id = ReplyId::from_uuid(path.into_inner());
    state.replies.mark_read(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::REPLY_MESSAGE_MAX;
    use crate::inbound::http::newsletters::SaveNewsletterRequest;
    use crate::inbound::http::test_utils::{
        admin_login_cookie, subscriber_login_cookie, test_app_state, test_session_middleware,
    };
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use serde_json::Value;

    fn reply_app(
        state: crate::inbound::http::state::HttpState,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(state))
            .wrap(test_session_middleware())
            .service(
                web::scope("/api/v1")
                    .service(crate::inbound::http::auth::login)
                    .service(crate::inbound::http::newsletters::create_newsletter)
                    .service(crate::inbound::http::subscriptions::subscribe)
                    .service(submit_reply)
                    .service(list_own_replies)
                    .service(list_replies)
                    .service(mark_reply_read),
            )
    }

    async fn published_newsletter_id<S, B, E>(
        app: &S,
        admin: &actix_web::cookie::Cookie<'static>,
    ) -> String
    where
        S: actix_web::dev::Service<
                actix_http::Request,
                Response = actix_web::dev::ServiceResponse<B>,
                Error = E,
            >,
        B: actix_web::body::MessageBody,
        E: std::fmt::Debug,
    {
        let res = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/newsletters")
                .cookie(admin.clone())
                .set_json(&SaveNewsletterRequest {
                    title: "Weekly Digest".into(),
                    content: "Hello readers".into(),
                    image_url: None,
                    category: None,
                    publish: true,
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("created body");
        body.get("id")
            .and_then(Value::as_str)
            .expect("id")
            .to_owned()
    }

    #[actix_web::test]
    async fn subscribed_readers_can_reply_and_admins_see_the_inbox() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(reply_app(state)).await;
        let admin = admin_login_cookie(&app).await;
        let id = published_newsletter_id(&app, &admin).await;

        let reader = subscriber_login_cookie(&app).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/newsletters/{id}/subscription"))
                .cookie(reader.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/newsletters/{id}/replies"))
                .cookie(reader)
                .set_json(&SubmitReplyRequest {
                    message: "Loved this issue".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/replies?filter=unread")
                .cookie(admin)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("inbox body");
        assert_eq!(body.get("unread"), Some(&Value::from(1)));
        assert_eq!(
            body.pointer("/replies/0/newsletterTitle"),
            Some(&Value::from("Weekly Digest"))
        );
    }

    #[actix_web::test]
    async fn overlong_messages_are_rejected_before_any_write() {
        let (state, stores) = test_app_state().await;
        let app = actix_test::init_service(reply_app(state)).await;
        let admin = admin_login_cookie(&app).await;
        let id = published_newsletter_id(&app, &admin).await;

        let reader = subscriber_login_cookie(&app).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/newsletters/{id}/subscription"))
                .cookie(reader.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/newsletters/{id}/replies"))
                .cookie(reader)
                .set_json(&SubmitReplyRequest {
                    message: "x".repeat(REPLY_MESSAGE_MAX + 1),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        use crate::domain::ports::ReplyRepository;
        assert_eq!(stores.replies.count().await.expect("count"), 0);
    }

    #[actix_web::test]
    async fn unsubscribed_readers_cannot_reply() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(reply_app(state)).await;
        let admin = admin_login_cookie(&app).await;
        let id = published_newsletter_id(&app, &admin).await;

        let reader = subscriber_login_cookie(&app).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/newsletters/{id}/replies"))
                .cookie(reader)
                .set_json(&SubmitReplyRequest {
                    message: "Hello".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn bad_filter_values_are_rejected() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(reply_app(state)).await;
        let admin = admin_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/replies?filter=starred")
                .cookie(admin)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
