use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::error;

use crate::api::handlers::{error_body, extract_bearer_token, SuccessResponse};
use crate::supabase::{IdentityClient, IdentityError};

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session revoked", body = SuccessResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Provider error"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, identity: Extension<IdentityClient>) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            error_body("No access token provided"),
        )
            .into_response();
    };

    match identity.sign_out(&token).await {
        Ok(()) => (StatusCode::OK, SuccessResponse::ok()).into_response(),
        Err(IdentityError::InvalidToken) => {
            (StatusCode::UNAUTHORIZED, error_body("Invalid token")).into_response()
        }
        Err(err) => {
            error!("logout failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("An error occurred during logout"),
            )
                .into_response()
        }
    }
}
