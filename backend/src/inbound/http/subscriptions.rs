//! Subscription API handlers.
//!
//! ```text
//! PUT    /api/v1/newsletters/{id}/subscription
//! DELETE /api/v1/newsletters/{id}/subscription
//! GET    /api/v1/subscriptions
//! ```

use actix_web::{HttpResponse, delete, get, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::NewsletterId;
use crate::domain::ports::SubscriptionView;

use super::ApiResult;
use super::newsletters::NewsletterResponse;
use super::session::SessionContext;
use super::state::HttpState;

/// Subscription listing item.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    /// The subscribed newsletter.
    #[serde(flatten)]
    pub newsletter: NewsletterResponse,
    /// When the caller subscribed.
    pub subscribed_at: DateTime<Utc>,
}

impl From<&SubscriptionView> for SubscriptionResponse {
    fn from(view: &SubscriptionView) -> Self {
        Self {
            newsletter: NewsletterResponse::from(&view.newsletter),
            subscribed_at: view.subscription.subscribed_at,
        }
    }
}

/// Subscribe the caller to a published newsletter.
///
/// Subscribing twice is a no-op and does not reset the cooldown anchor.
#[utoipa::path(
    put,
    path = "/api/v1/newsletters/{id}/subscription",
    params(("id" = Uuid, Path, description = "Newsletter identifier")),
    responses(
        (status = 204, description = "Subscribed"),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 404, description = "Unknown or unpublished newsletter", body = crate::domain::Error)
    ),
    tags = ["subscriptions"],
    operation_id = "subscribe"
)]
#[put("/newsletters/{id}/subscription")]
pub async fn subscribe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let id = NewsletterId::from_uuid(path.into_inner());
    state.subscriptions.subscribe(&user.user_id, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Unsubscribe the caller, unless the 24-hour cooldown is still open.
#[utoipa::path(
    delete,
    path = "/api/v1/newsletters/{id}/subscription",
    params(("id" = Uuid, Path, description = "Newsletter identifier")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 404, description = "Not subscribed", body = crate::domain::Error),
        (status = 409, description = "Cooldown still active", body = crate::domain::Error)
    ),
    tags = ["subscriptions"],
    operation_id = "unsubscribe"
)]
#[delete("/newsletters/{id}/subscription")]
pub async fn unsubscribe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let id = NewsletterId::from_uuid(path.into_inner());
    state.subscriptions.unsubscribe(&user.user_id, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List the caller's subscriptions.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions",
    responses(
        (status = 200, description = "Subscriptions", body = [SubscriptionResponse]),
        (status = 401, description = "Not logged in", body = crate::domain::Error)
    ),
    tags = ["subscriptions"],
    operation_id = "listSubscriptions"
)]
#[get("/subscriptions")]
pub async fn list_subscriptions(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<SubscriptionResponse>>> {
    let user = session.require_user()?;
    let views = state.subscriptions.list(&user.user_id).await?;
    Ok(web::Json(
        views.iter().map(SubscriptionResponse::from).collect(),
    ))
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

    fn subscription_app(
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
                    .service(subscribe)
                    .service(unsubscribe)
                    .service(list_subscriptions),
            )
    }

    async fn create_newsletter<S, B, E>(
        app: &S,
        cookie: &actix_web::cookie::Cookie<'static>,
        publish: bool,
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
                .cookie(cookie.clone())
                .set_json(&SaveNewsletterRequest {
                    title: "Weekly Digest".into(),
                    content: "Hello readers".into(),
                    image_url: None,
                    category: None,
                    publish,
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
    async fn subscribe_then_list_round_trip() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(subscription_app(state)).await;
        let admin = admin_login_cookie(&app).await;
        let id = create_newsletter(&app, &admin, true).await;

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
            actix_test::TestRequest::get()
                .uri("/api/v1/subscriptions")
                .cookie(reader)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("list body");
        let items = body.as_array().expect("array");
        assert_eq!(items.len(), 1);
        assert_eq!(
            items.first().and_then(|i| i.get("title")),
            Some(&Value::from("Weekly Digest"))
        );
    }

    #[actix_web::test]
    async fn unsubscribe_inside_the_cooldown_is_conflict() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(subscription_app(state)).await;
        let admin = admin_login_cookie(&app).await;
        let id = create_newsletter(&app, &admin, true).await;

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
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/newsletters/{id}/subscription"))
                .cookie(reader)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("error body");
        assert_eq!(
            body.pointer("/details/code"),
            Some(&Value::from("cooldown_active"))
        );
        assert_eq!(
            body.pointer("/details/hoursRemaining"),
            Some(&Value::from(24))
        );
    }

    #[actix_web::test]
    async fn drafts_cannot_be_subscribed_to() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(subscription_app(state)).await;
        let admin = admin_login_cookie(&app).await;
        let id = create_newsletter(&app, &admin, false).await;

        let reader = subscriber_login_cookie(&app).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/newsletters/{id}/subscription"))
                .cookie(reader)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn anonymous_calls_are_unauthorised() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(subscription_app(state)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/subscriptions")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
