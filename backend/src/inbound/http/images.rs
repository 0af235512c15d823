//! Image upload handler.
//!
//! The server forwards validated image bytes to the external image host
//! and hands the hosted URL back; clients never talk to the host
//! directly. The previous system posted form data straight from the
//! browser with no size or type check beyond the UI.

use actix_web::{HttpRequest, HttpResponse, http::header, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::Error;
use crate::domain::ports::ImageStoreError;

use super::ApiResult;
use super::session::SessionContext;
use super::state::HttpState;

/// Largest accepted upload, in bytes.
pub const IMAGE_MAX_BYTES: usize = 10 * 1024 * 1024;

const ACCEPTED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// Upload response body.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    /// Hosted secure URL for the uploaded image.
    pub url: String,
}

/// Upload query parameters.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UploadQuery {
    /// Original filename, used by the host for the stored object name.
    pub filename: Option<String>,
}

fn map_image_error(error: ImageStoreError) -> Error {
    match error {
        ImageStoreError::Rejected { message } => {
            Error::invalid_request(format!("image host rejected the upload: {message}"))
        }
        ImageStoreError::Unavailable { message } => {
            Error::service_unavailable(format!("image host unavailable: {message}"))
        }
    }
}

/// Upload a newsletter hero image.
///
/// The body is the raw image; `Content-Type` must be JPEG, PNG, or GIF
/// and the payload at most 10 MiB.
#[utoipa::path(
    post,
    path = "/api/v1/admin/images",
    params(UploadQuery),
    request_body(content = Vec<u8>, description = "Raw image bytes (JPEG, PNG, or GIF)", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Image hosted", body = ImageUploadResponse),
        (status = 400, description = "Unsupported type or oversized payload", body = crate::domain::Error),
        (status = 401, description = "Not logged in", body = crate::domain::Error),
        (status = 403, description = "Not an administrator", body = crate::domain::Error)
    ),
    tags = ["images"],
    operation_id = "uploadImage"
)]
#[post("/admin/images")]
pub async fn upload_image(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    if !ACCEPTED_TYPES.contains(&content_type.as_str()) {
        return Err(
            Error::invalid_request("only JPEG, PNG, or GIF images are supported")
                .with_details(json!({ "field": "contentType", "code": "unsupported_type" })),
        );
    }
    if body.is_empty() {
        return Err(Error::invalid_request("image payload is empty")
            .with_details(json!({ "field": "body", "code": "empty_payload" })));
    }
    if body.len() > IMAGE_MAX_BYTES {
        return Err(Error::invalid_request("image size exceeds 10 MiB")
            .with_details(json!({ "field": "body", "code": "payload_too_large" })));
    }

    let filename = query
        .into_inner()
        .filename
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "upload".to_owned());
    let url = state
        .images
        .upload(&filename, &content_type, body.to_vec())
        .await
        .map_err(map_image_error)?;
    Ok(HttpResponse::Created().json(ImageUploadResponse { url }))
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

    fn image_app(
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
                    .service(upload_image),
            )
    }

    #[actix_web::test]
    async fn valid_uploads_return_a_hosted_url() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(image_app(state)).await;
        let admin = admin_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/images?filename=hero.png")
                .cookie(admin)
                .insert_header((header::CONTENT_TYPE, "image/png"))
                .set_payload(vec![0x89, 0x50, 0x4e, 0x47])
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value =
            serde_json::from_slice(&actix_test::read_body(res).await).expect("upload body");
        let url = body.get("url").and_then(Value::as_str).expect("url");
        assert!(url.ends_with("/hero.png"));
    }

    #[actix_web::test]
    async fn unsupported_content_types_are_rejected() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(image_app(state)).await;
        let admin = admin_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/images")
                .cookie(admin)
                .insert_header((header::CONTENT_TYPE, "image/svg+xml"))
                .set_payload(vec![1, 2, 3])
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn subscribers_cannot_upload() {
        let (state, _stores) = test_app_state().await;
        let app = actix_test::init_service(image_app(state)).await;
        let reader = subscriber_login_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/admin/images")
                .cookie(reader)
                .insert_header((header::CONTENT_TYPE, "image/png"))
                .set_payload(vec![1, 2, 3])
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
