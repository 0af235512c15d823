//! Admin dashboard handler.

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DashboardSnapshot;

use super::ApiResult;
use super::newsletters::NewsletterResponse;
use super::session::SessionContext;
use super::state::HttpState;

/// Dashboard response body.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Total newsletters, drafts included.
    pub total_newsletters: u64,
    /// Newsletter creations, current vs previous 7-day window, percent.
    pub newsletter_growth: f64,
    /// Subscriber accounts that are not disabled.
    pub active_subscribers: u64,
    /// Subscriber sign-ups, current vs previous 7-day window, percent.
    pub subscriber_growth: f64,
    /// Total replies.
    pub total_replies: u64,
    /// Replies, current vs previous 7-day window, percent.
    pub reply_growth: f64,
    /// Most recently published newsletter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_published: Option<LastPublishedResponse>,
    /// Three most recently created newsletters.
    pub recent: Vec<NewsletterResponse>,
    /// Reply counts per day over the trailing week, oldest first.
    pub engagement: Vec<u64>,
    /// Engagement growth over the series, percent.
    pub engagement_growth: f64,
}

/// Title and timestamp of the last published newsletter.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastPublishedResponse {
    /// Issue title.
    pub title: String,
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
}

impl From<&DashboardSnapshot> for DashboardResponse {
    fn from(snapshot: &DashboardSnapshot) -> Self {
        Self {
            total_newsletters: snapshot.total_newsletters,
            newsletter_growth: snapshot.newsletter_growth,
            active_subscribers: snapshot.active_subscribers,
            subscriber_growth: snapshot.subscriber_growth,
            total_replies: snapshot.total_replies,
            reply_growth: snapshot.reply_growth,
            last_published: snapshot.last_published.as_ref().and_then(|newsletter| {
                newsletter.published_at().map(|published_at| LastPublishedResponse {
                    title: newsletter.title().to_string(),
                    published_at,
                })
            }),
            recent: snapshot.recent.iter().map(NewsletterResponse::from).collect(),
            engagement: snapshot.engagement.buckets().to_vec(),
            engagement_growth: snapshot.engagement_growth,
        }
    }
}

/// Aggregate totals, growth windows, and engagement for the admin console.
#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 403, description = "Not an administrator", body = crate::domain::Error)
    ),
    tags = ["dashboard"],
    operation_id = "dashboard"
)]
#[get("/admin/dashboard")]
pub async fn dashboard(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<DashboardResponse>> {
    session.require_admin()?;
    let snapshot = state.dashboard.snapshot().await?;
    Ok(web::Json(DashboardResponse::from(&snapshot)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::newsletters::SaveNewsletterRequest;
    use crate::inbound::http::test_utils::{
        admin_login_cookie, subscriber_login_cookie, test_app_state, test_session_middleware,
    };
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use serde_json::Value;

    fn dashboard_app(
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
                    .service(dashboard),
            )
    }

    #[actix_web::test]
    async fn dashboard_reflects_created_newsletters() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(dashboard_app(state)).await;
        let admin = admin_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
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

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/dashboard")
                .cookie(admin)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("dashboard body");
        assert_eq!(body.get("totalNewsletters"), Some(&Value::from(1)));
        assert_eq!(body.get("newsletterGrowth"), Some(&Value::from(100.0)));
        assert_eq!(
            body.pointer("/lastPublished/title"),
            Some(&Value::from("Weekly Digest"))
        );
        assert_eq!(
            body.get("engagement").and_then(Value::as_array).map(Vec::len),
            Some(7)
        );
    }

    #[actix_web::test]
    async fn subscribers_cannot_see_the_dashboard() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(dashboard_app(state)).await;
        let reader = subscriber_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/dashboard")
                .cookie(reader)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
