//! User administration and account settings handlers.
//!
//! ```text
//! GET    /api/v1/admin/users
//! POST   /api/v1/admin/users/{id}/disabled {"disabled":true}
//! DELETE /api/v1/admin/users/{id}
//! GET    /api/v1/settings
//! PUT    /api/v1/settings {"displayName":"..."}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{Account, DisplayName, Error, UserId};

use super::ApiResult;
use super::auth::MeResponse;
use super::session::SessionContext;
use super::state::HttpState;

/// Subscriber listing item for the admin console.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberResponse {
    /// Account identifier.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Whether the account is currently disabled.
    pub disabled: bool,
    /// Sign-up timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for SubscriberResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: *account.id().as_uuid(),
            email: account.email().to_string(),
            display_name: account.display_name().to_string(),
            disabled: account.is_disabled(),
            created_at: account.created_at(),
        }
    }
}

/// Disable/enable request body.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetDisabledRequest {
    /// New disabled state.
    pub disabled: bool,
}

/// Settings update body.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    /// New display name.
    pub display_name: String,
}

/// List subscriber accounts.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "Subscribers", body = [SubscriberResponse]),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 403, description = "Not an administrator", body = crate::domain::Error)
    ),
    tags = ["users"],
    operation_id = "listSubscribers"
)]
#[get("/admin/users")]
pub async fn list_subscribers(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<SubscriberResponse>>> {
    session.require_admin()?;
    let subscribers = state.accounts.list_subscribers().await?;
    Ok(web::Json(
        subscribers.iter().map(SubscriberResponse::from).collect(),
    ))
}

/// Enable or disable a subscriber account.
///
/// Disabled accounts cannot log in; existing sessions lapse when the
/// cookie expires.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/disabled",
    request_body = SetDisabledRequest,
    params(("id" = Uuid, Path, description = "Account identifier")),
    responses(
        (status = 204, description = "State updated"),
        (status = 404, description = "Unknown account", body = crate::domain::Error)
    ),
    tags = ["users"],
    operation_id = "setUserDisabled"
)]
#[post("/admin/users/{id}/disabled")]
pub async fn set_user_disabled(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<SetDisabledRequest>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let id = UserId::from_uuid(path.into_inner());
    state.accounts.set_disabled(&id, payload.disabled).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Delete a subscriber account; subscriptions and replies cascade.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "Account identifier")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "Unknown account", body = crate::domain::Error)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/admin/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let id = UserId::from_uuid(path.into_inner());
    state.accounts.delete(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Fetch the caller's account settings.
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses(
        (status = 200, description = "Settings", body = MeResponse),
        (status = 401, description = "Not logged in", body = crate::domain::Error)
    ),
    tags = ["users"],
    operation_id = "getSettings"
)]
#[get("/settings")]
pub async fn get_settings(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<MeResponse>> {
    let user = session.require_user()?;
    let account = state.accounts.current(&user.user_id).await?;
    Ok(web::Json(MeResponse::from(&account)))
}

/// Update the caller's display name.
#[utoipa::path(
    put,
    path = "/api/v1/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = MeResponse),
        (status = 400, description = "Invalid display name", body = crate::domain::Error),
        (status = 401, description = "Not logged in", body = crate::domain::Error)
    ),
    tags = ["users"],
    operation_id = "updateSettings"
)]
#[put("/settings")]
pub async fn update_settings(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<UpdateSettingsRequest>,
) -> ApiResult<web::Json<MeResponse>> {
    let user = session.require_user()?;
    let display_name = DisplayName::new(&payload.display_name).map_err(|err| {
        Error::invalid_request(err.to_string())
            .with_details(json!({ "field": "displayName", "code": "invalid_display_name" }))
    })?;
    let account = state
        .accounts
        .update_display_name(&user.user_id, display_name)
        .await?;
    Ok(web::Json(MeResponse::from(&account)))
}
