//! Auth API handlers.
//!
//! ```text
//! POST /api/v1/auth/signup {"email":"...","password":"...","confirmPassword":"..."}
//! POST /api/v1/auth/login {"email":"...","password":"..."}
//! POST /api/v1/auth/logout
//! POST /api/v1/auth/verify {"code":"..."}
//! POST /api/v1/auth/reset-password {"email":"..."}
//! GET  /api/v1/auth/me
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{Account, AccountValidationError, EmailAddress, Error};

use super::session::SessionContext;
use super::state::HttpState;
use super::ApiResult;

/// Sign-up request body.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Email address to register.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Password repeated, rejected on mismatch.
    pub confirm_password: String,
}

/// Login request body.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Registered email address.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Verification request body.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Code from the verification email.
    pub code: String,
}

/// Password reset request body.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Email address to send the reset link to.
    pub email: String,
}

/// Current-account response body.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// Account identifier.
    pub id: String,
    /// Account email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Access role (`user` or `admin`).
    pub role: String,
}

impl From<&Account> for MeResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id().to_string(),
            email: account.email().to_string(),
            display_name: account.display_name().to_string(),
            role: account.role().to_string(),
        }
    }
}

fn parse_email(raw: &str) -> Result<EmailAddress, Error> {
    EmailAddress::new(raw).map_err(map_email_error)
}

fn map_email_error(err: AccountValidationError) -> Error {
    Error::invalid_request(err.to_string())
        .with_details(json!({ "field": "email", "code": "invalid_email" }))
}

/// Register a new account and send the verification email.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, verification email sent"),
        (status = 400, description = "Invalid request", body = crate::domain::Error),
        (status = 409, description = "Email already registered", body = crate::domain::Error)
    ),
    tags = ["auth"],
    operation_id = "signup",
    security([])
)]
#[post("/auth/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    payload: web::Json<SignupRequest>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    if body.password != body.confirm_password {
        return Err(Error::invalid_request("passwords do not match")
            .with_details(json!({ "field": "confirmPassword", "code": "password_mismatch" })));
    }
    let email = parse_email(&body.email)?;
    state.accounts.sign_up(email, &body.password).await?;
    Ok(HttpResponse::Created().finish())
}

/// Authenticate and establish a session.
///
/// Unverified identities and disabled accounts are rejected; no session
/// is established for them.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = MeResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = crate::domain::Error),
        (status = 401, description = "Invalid credentials", body = crate::domain::Error),
        (status = 403, description = "Unverified or disabled account", body = crate::domain::Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<MeResponse>> {
    let body = payload.into_inner();
    let email = parse_email(&body.email)?;
    let account = state.accounts.login(email, &body.password).await?;
    session.persist(account.id(), account.role())?;
    Ok(web::Json(MeResponse::from(&account)))
}

/// Drop the caller's session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout",
    security([])
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> ApiResult<HttpResponse> {
    session.clear();
    Ok(HttpResponse::Ok().finish())
}

/// Apply an emailed verification code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Email verified"),
        (status = 400, description = "Invalid or expired code", body = crate::domain::Error)
    ),
    tags = ["auth"],
    operation_id = "verifyEmail",
    security([])
)]
#[post("/auth/verify")]
pub async fn verify(
    state: web::Data<HttpState>,
    payload: web::Json<VerifyRequest>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    if body.code.trim().is_empty() {
        return Err(Error::invalid_request("verification code must not be empty")
            .with_details(json!({ "field": "code", "code": "empty_code" })));
    }
    state.accounts.verify_email(body.code.trim()).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Trigger a password reset email.
///
/// Always answers 200 for well-formed emails so the endpoint cannot be
/// used to probe which addresses exist.
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent if the account exists"),
        (status = 400, description = "Invalid request", body = crate::domain::Error)
    ),
    tags = ["auth"],
    operation_id = "resetPassword",
    security([])
)]
#[post("/auth/reset-password")]
pub async fn reset_password(
    state: web::Data<HttpState>,
    payload: web::Json<ResetPasswordRequest>,
) -> ApiResult<HttpResponse> {
    let email = parse_email(&payload.email)?;
    state.accounts.request_password_reset(&email).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Describe the authenticated account.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current account", body = MeResponse),
        (status = 401, description = "Not logged in", body = crate::domain::Error)
    ),
    tags = ["auth"],
    operation_id = "currentAccount"
)]
#[get("/auth/me")]
pub async fn me(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<MeResponse>> {
    let user = session.require_user()?;
    let account = state.accounts.current(&user.user_id).await?;
    Ok(web::Json(MeResponse::from(&account)))
}
