//! Newsletter API handlers.
//!
//! ```text
//! POST   /api/v1/admin/newsletters
//! GET    /api/v1/admin/newsletters?limit=20
//! GET    /api/v1/admin/newsletters/{id}
//! PUT    /api/v1/admin/newsletters/{id}
//! DELETE /api/v1/admin/newsletters/{id}
//! GET    /api/v1/newsletters?limit=20        (published, subscriber view)
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    Category, Error, Newsletter, NewsletterDraft, NewsletterId, NewsletterOverview,
    NewsletterTitle, NewsletterValidationError, PublishedNewsletter,
};

use super::ApiResult;
use super::session::SessionContext;
use super::state::HttpState;

/// Create/update request body for a newsletter.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveNewsletterRequest {
    /// Issue title; must not be blank.
    pub title: String,
    /// Issue body; must not be blank.
    pub content: String,
    /// Hosted hero image URL, if one was uploaded.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Editorial category; blank or missing becomes `General`.
    #[serde(default)]
    pub category: Option<String>,
    /// Publish immediately instead of saving a draft.
    #[serde(default)]
    pub publish: bool,
}

impl TryFrom<&SaveNewsletterRequest> for NewsletterDraft {
    type Error = Error;

    fn try_from(value: &SaveNewsletterRequest) -> Result<Self, Self::Error> {
        let title = NewsletterTitle::new(&value.title).map_err(map_validation_error)?;
        let body = crate::domain::NewsletterBody::new(&value.content)
            .map_err(map_validation_error)?;
        let category = match value.category.as_deref() {
            None | Some("") => Category::default(),
            Some(raw) if raw.trim().is_empty() => Category::default(),
            Some(raw) => Category::new(raw).map_err(map_validation_error)?,
        };
        Ok(Self {
            title,
            body,
            image_url: value.image_url.clone().filter(|url| !url.trim().is_empty()),
            category,
        })
    }
}

/// Newsletter response body shared by admin and subscriber views.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterResponse {
    /// Identifier.
    pub id: Uuid,
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub content: String,
    /// Hosted hero image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Editorial category.
    pub category: String,
    /// Authoring administrator's display name.
    pub author: String,
    /// `draft` or `published`.
    pub status: String,
    /// Publication timestamp, present once published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Newsletter> for NewsletterResponse {
    fn from(newsletter: &Newsletter) -> Self {
        Self {
            id: *newsletter.id().as_uuid(),
            title: newsletter.title().to_string(),
            content: newsletter.body().as_ref().to_owned(),
            image_url: newsletter.image_url().map(str::to_owned),
            category: newsletter.category().to_string(),
            author: newsletter.author().to_string(),
            status: newsletter.status().to_string(),
            published_at: newsletter.published_at(),
            created_at: newsletter.created_at(),
        }
    }
}

/// Admin newsletter listing item with derived counts.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterOverviewResponse {
    /// The newsletter.
    #[serde(flatten)]
    pub newsletter: NewsletterResponse,
    /// Live subscription count.
    pub subscriber_count: u64,
    /// Live reply count.
    pub reply_count: u64,
}

impl From<&NewsletterOverview> for NewsletterOverviewResponse {
    fn from(overview: &NewsletterOverview) -> Self {
        Self {
            newsletter: NewsletterResponse::from(&overview.newsletter),
            subscriber_count: overview.subscriber_count,
            reply_count: overview.reply_count,
        }
    }
}

/// Subscriber browsing item with the viewer's subscription state.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishedNewsletterResponse {
    /// The newsletter.
    #[serde(flatten)]
    pub newsletter: NewsletterResponse,
    /// Live subscription count.
    pub subscriber_count: u64,
    /// When the viewer subscribed, when they did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed_at: Option<DateTime<Utc>>,
}

impl From<&PublishedNewsletter> for PublishedNewsletterResponse {
    fn from(published: &PublishedNewsletter) -> Self {
        Self {
            newsletter: NewsletterResponse::from(&published.newsletter),
            subscriber_count: published.subscriber_count,
            subscribed_at: published.subscribed_at,
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// Cap on the number of returned newsletters.
    pub limit: Option<u32>,
}

fn map_validation_error(err: NewsletterValidationError) -> Error {
    let (field, code) = match &err {
        NewsletterValidationError::EmptyTitle => ("title", "empty_title"),
        NewsletterValidationError::TitleTooLong { .. } => ("title", "title_too_long"),
        NewsletterValidationError::EmptyBody => ("content", "empty_content"),
        NewsletterValidationError::EmptyCategory => ("category", "empty_category"),
        NewsletterValidationError::CategoryTooLong { .. } => ("category", "category_too_long"),
        NewsletterValidationError::UnknownStatus => ("status", "unknown_status"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

/// Create a newsletter as a draft or publish it immediately.
#[utoipa::path(
    post,
    path = "/api/v1/admin/newsletters",
    request_body = SaveNewsletterRequest,
    responses(
        (status = 201, description = "Newsletter created", body = NewsletterResponse),
        (status = 400, description = "Invalid request", body = crate::domain::Error),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 403, description = "Not an administrator", body = crate::domain::Error)
    ),
    tags = ["newsletters"],
    operation_id = "createNewsletter"
)]
#[post("/admin/newsletters")]
pub async fn create_newsletter(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SaveNewsletterRequest>,
) -> ApiResult<HttpResponse> {
    let admin = session.require_admin()?;
    let body = payload.into_inner();
    let draft = NewsletterDraft::try_from(&body)?;
    let author = state.accounts.current(&admin.user_id).await?;
    let newsletter = state
        .newsletters
        .create(draft, author.display_name().clone(), body.publish)
        .await?;
    Ok(HttpResponse::Created().json(NewsletterResponse::from(&newsletter)))
}

/// Revise a newsletter, optionally publishing it.
#[utoipa::path(
    put,
    path = "/api/v1/admin/newsletters/{id}",
    request_body = SaveNewsletterRequest,
    params(("id" = Uuid, Path, description = "Newsletter identifier")),
    responses(
        (status = 200, description = "Newsletter updated", body = NewsletterResponse),
        (status = 400, description = "Invalid request", body = crate::domain::Error),
        (status = 404, description = "Unknown newsletter", body = crate::domain::Error)
    ),
    tags = ["newsletters"],
    operation_id = "updateNewsletter"
)]
#[put("/admin/newsletters/{id}")]
pub async fn update_newsletter(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<SaveNewsletterRequest>,
) -> ApiResult<web::Json<NewsletterResponse>> {
    session.require_admin()?;
    let id = NewsletterId::from_uuid(path.into_inner());
    let body = payload.into_inner();
    let draft = NewsletterDraft::try_from(&body)?;
    let newsletter = state.newsletters.update(&id, draft, body.publish).await?;
    Ok(web::Json(NewsletterResponse::from(&newsletter)))
}

/// Delete a newsletter; subscriptions and replies cascade.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/newsletters/{id}",
    params(("id" = Uuid, Path, description = "Newsletter identifier")),
    responses(
        (status = 204, description = "Newsletter deleted"),
        (status = 404, description = "Unknown newsletter", body = crate::domain::Error)
    ),
    tags = ["newsletters"],
    operation_id = "deleteNewsletter"
)]
#[delete("/admin/newsletters/{id}")]
pub async fn delete_newsletter(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let id = NewsletterId::from_uuid(path.into_inner());
    state.newsletters.delete(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List newsletters of any status with derived counts.
#[utoipa::path(
    get,
    path = "/api/v1/admin/newsletters",
    params(ListQuery),
    responses(
        (status = 200, description = "Newsletters", body = [NewsletterOverviewResponse]),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 403, description = "Not an administrator", body = crate::domain::Error)
    ),
    tags = ["newsletters"],
    operation_id = "listNewsletters"
)]
#[get("/admin/newsletters")]
pub async fn list_newsletters(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListQuery>,
) -> ApiResult<web::Json<Vec<NewsletterOverviewResponse>>> {
    session.require_admin()?;
    let overviews = state.newsletters.list(query.limit).await?;
    Ok(web::Json(
        overviews.iter().map(NewsletterOverviewResponse::from).collect(),
    ))
}

/// Fetch one newsletter with derived counts.
#[utoipa::path(
    get,
    path = "/api/v1/admin/newsletters/{id}",
    params(("id" = Uuid, Path, description = "Newsletter identifier")),
    responses(
        (status = 200, description = "Newsletter", body = NewsletterOverviewResponse),
        (status = 404, description = "Unknown newsletter", body = crate::domain::Error)
    ),
    tags = ["newsletters"],
    operation_id = "getNewsletter"
)]
#[get("/admin/newsletters/{id}")]
pub async fn get_newsletter(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<NewsletterOverviewResponse>> {
    session.require_admin()?;
    let id = NewsletterId::from_uuid(path.into_inner());
    let overview = state.newsletters.get(&id).await?;
    Ok(web::Json(NewsletterOverviewResponse::from(&overview)))
}

/// Browse published newsletters with the viewer's subscription state.
#[utoipa::path(
    get,
    path = "/api/v1/newsletters",
    params(ListQuery),
    responses(
        (status = 200, description = "Published newsletters", body = [PublishedNewsletterResponse]),
        (status = 401, description = "Not logged in", body = crate::domain::Error)
    ),
    tags = ["newsletters"],
    operation_id = "browseNewsletters"
)]
#[get("/newsletters")]
pub async fn browse_newsletters(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListQuery>,
) -> ApiResult<web::Json<Vec<PublishedNewsletterResponse>>> {
    let user = session.require_user()?;
    let published = state
        .newsletters
        .browse_published(&user.user_id, query.limit)
        .await?;
    Ok(web::Json(
        published.iter().map(PublishedNewsletterResponse::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{
        admin_login_cookie, subscriber_login_cookie, test_app_state, test_session_middleware,
    };
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use serde_json::Value;

    fn newsletter_app(
        state: HttpState,
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
                    .service(create_newsletter)
                    .service(update_newsletter)
                    .service(delete_newsletter)
                    .service(list_newsletters)
                    .service(get_newsletter)
                    .service(browse_newsletters),
            )
    }

    fn save_request(title: &str, content: &str, publish: bool) -> SaveNewsletterRequest {
        SaveNewsletterRequest {
            title: title.into(),
            content: content.into(),
            image_url: None,
            category: None,
            publish,
        }
    }

    #[actix_web::test]
    async fn empty_title_is_rejected_and_nothing_is_written() {
        let (state, stores) = test_app_state().await;
        let app = actix_test::init_service(newsletter_app(state)).await;
        let cookie = admin_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/newsletters")
                .cookie(cookie.clone())
                .set_json(&save_request("   ", "body", false))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/newsletters")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("list body");
        assert_eq!(body.as_array().map(Vec::len), Some(0));
        let _ = stores;
    }

    #[actix_web::test]
    async fn create_then_list_round_trip() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(newsletter_app(state)).await;
        let cookie = admin_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/newsletters")
                .cookie(cookie.clone())
                .set_json(&save_request("Weekly Digest", "Hello readers", true))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("created body");
        assert_eq!(created.get("status"), Some(&Value::from("published")));
        assert_eq!(created.get("category"), Some(&Value::from("General")));

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/newsletters")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("list body");
        let items = body.as_array().expect("array");
        assert_eq!(items.len(), 1);
        assert_eq!(
            items.first().and_then(|i| i.get("subscriberCount")),
            Some(&Value::from(0))
        );
    }

    #[actix_web::test]
    async fn delete_removes_the_newsletter_from_listings() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(newsletter_app(state)).await;
        let cookie = admin_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/newsletters")
                .cookie(cookie.clone())
                .set_json(&save_request("Doomed", "body", false))
                .to_request(),
        )
        .await;
        let created: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("created body");
        let id = created.get("id").and_then(Value::as_str).expect("id");

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/admin/newsletters/{id}"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/newsletters")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("list body");
        assert_eq!(body.as_array().map(Vec::len), Some(0));
    }

    #[actix_web::test]
    async fn subscribers_cannot_reach_the_admin_surface() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(newsletter_app(state)).await;
        let cookie = subscriber_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/newsletters")
                .cookie(cookie)
                .set_json(&save_request("Sneaky", "body", true))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn browsing_shows_published_issues_only() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(newsletter_app(state)).await;
        let admin = admin_login_cookie(&app).await;

        for (title, publish) in [("live", true), ("hidden draft", false)] {
            let res = actix_test::call_service(
                &app,
                actix_test::TestRequest::post()
                    .uri("/api/v1/admin/newsletters")
                    .cookie(admin.clone())
                    .set_json(&save_request(title, "body", publish))
                    .to_request(),
            )
            .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let reader = subscriber_login_cookie(&app).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/newsletters")
                .cookie(reader)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("browse body");
        let items = body.as_array().expect("array");
        assert_eq!(items.len(), 1);
        assert_eq!(
            items.first().and_then(|i| i.get("title")),
            Some(&Value::from("live"))
        );
    }
}
