//! Authenticated self-service endpoints for the signed-in admin.
//!
//! All three operations run the gateway first; the privileged connector is
//! then used only for the profile read/update and the password change, which
//! is exactly the scope it exists for.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

use super::auth::gateway::{authorize, CONFIGURATION_ERROR_MESSAGE};
use super::{error_body, SuccessResponse};
use crate::supabase::{IdentityClient, ServiceClient, ServiceError};

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Profile of the signed-in admin", body = SettingsResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Configuration or provider error"),
    ),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn get_settings(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
) -> impl IntoResponse {
    let admin = match authorize(&headers, &identity, &service).await {
        Ok(admin) => admin,
        Err(err) => return err.into_response(),
    };

    (
        StatusCode::OK,
        Json(SettingsResponse {
            email: admin.identity.email,
            first_name: admin.profile.first_name,
            last_name: admin.profile.last_name,
        }),
    )
        .into_response()
}

#[utoipa::path(
    put,
    path = "/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Profile updated", body = SuccessResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Update failed"),
    ),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn update_settings(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let admin = match authorize(&headers, &identity, &service).await {
        Ok(admin) => admin,
        Err(err) => return err.into_response(),
    };

    let request: UpdateSettingsRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                error_body(&format!("Invalid request body: {err}")),
            )
                .into_response()
        }
    };

    let first_name = normalize_optional(request.first_name);
    let last_name = normalize_optional(request.last_name);

    match service
        .update_profile_names(admin.identity.id, first_name, last_name)
        .await
    {
        Ok(_) => (StatusCode::OK, SuccessResponse::ok()).into_response(),
        Err(err) => {
            error!("profile update failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to update profile"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/settings",
    responses(
        (status = 200, description = "Password changed", body = SuccessResponse),
        (status = 400, description = "Password too short"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Password change failed"),
    ),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn change_password(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let admin = match authorize(&headers, &identity, &service).await {
        Ok(admin) => admin,
        Err(err) => return err.into_response(),
    };

    let new_password = body
        .get("new_password")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if new_password.chars().count() < MIN_PASSWORD_CHARS {
        return (
            StatusCode::BAD_REQUEST,
            error_body("Password must be at least 6 characters"),
        )
            .into_response();
    }

    match service
        .update_user_password(admin.identity.id, new_password)
        .await
    {
        Ok(()) => (StatusCode::OK, SuccessResponse::ok()).into_response(),
        Err(ServiceError::Configuration) => {
            error!("service-role key is not configured; cannot change password");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(CONFIGURATION_ERROR_MESSAGE),
            )
                .into_response()
        }
        Err(err) => {
            error!("password update failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to update password"),
            )
                .into_response()
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
