//! Guard endpoint for admin-facing pages.
//!
//! Runs the same gateway as every protected route but reports the outcome
//! instead of forbidding: a valid token with a non-admin (or missing) profile
//! gets `200 {isAdmin: false}` so the frontend can redirect to login.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};

use super::gateway::{authorize, AuthError};
use super::types::CheckResponse;
use crate::supabase::{IdentityClient, ServiceClient};

#[utoipa::path(
    get,
    path = "/auth/check",
    responses(
        (status = 200, description = "Token is valid; body tells whether the holder is an admin", body = CheckResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Configuration or provider error"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn check(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
) -> impl IntoResponse {
    match authorize(&headers, &identity, &service).await {
        Ok(admin) => (
            StatusCode::OK,
            Json(CheckResponse {
                is_admin: true,
                role: Some(admin.profile.role),
                user_id: admin.identity.id,
            }),
        )
            .into_response(),
        Err(AuthError::Forbidden { user_id, role }) => (
            StatusCode::OK,
            Json(CheckResponse {
                is_admin: false,
                role,
                user_id,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
