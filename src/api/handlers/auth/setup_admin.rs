//! One-time bootstrap of the first admin.
//!
//! The only place a profile is created with `role = admin` directly. Gated to
//! non-production environments; if the profile insert fails after the
//! identity was created, the identity is rolled back so it cannot linger
//! with no profile and no path to admin through normal logins.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::Value;
use tracing::{error, warn};

use super::gateway::CONFIGURATION_ERROR_MESSAGE;
use super::types::SetupAdminResponse;
use crate::api::handlers::{error_body, valid_email};
use crate::api::ServerConfig;
use crate::supabase::{Role, ServiceClient, ServiceError};

#[utoipa::path(
    post,
    path = "/auth/setup-admin",
    request_body = super::types::SetupAdminRequest,
    responses(
        (status = 200, description = "Admin identity and profile created", body = SetupAdminResponse),
        (status = 400, description = "Missing fields or provider rejection"),
        (status = 403, description = "Disabled in production"),
        (status = 500, description = "Configuration error or rollback"),
    ),
    tag = "auth"
)]
pub async fn setup_admin(
    service: Extension<ServiceClient>,
    config: Extension<ServerConfig>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if config.environment.is_production() {
        return (
            StatusCode::FORBIDDEN,
            error_body("This endpoint is disabled in production"),
        )
            .into_response();
    }

    let email = body
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty());

    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_body("Email and password are required"),
            )
                .into_response()
        }
    };

    if !valid_email(email) {
        return (StatusCode::BAD_REQUEST, error_body("Invalid email address")).into_response();
    }

    let identity = match service.create_user(email, password).await {
        Ok(identity) => identity,
        Err(ServiceError::Rejected(message)) => {
            return (
                StatusCode::BAD_REQUEST,
                error_body(&format!("Failed to create user: {message}")),
            )
                .into_response()
        }
        Err(ServiceError::Configuration) => {
            error!("service-role key is not configured; cannot bootstrap an admin");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(CONFIGURATION_ERROR_MESSAGE),
            )
                .into_response();
        }
        Err(err) => {
            error!("admin bootstrap user creation failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("User creation failed"),
            )
                .into_response();
        }
    };

    if let Err(err) = service.create_profile(identity.id, Role::Admin).await {
        // Roll the identity back; an identity without a profile has no path
        // to admin through the normal login flow.
        if let Err(rollback_err) = service.delete_user(identity.id).await {
            warn!("identity rollback failed after profile error: {rollback_err}");
        }
        error!("admin bootstrap profile creation failed: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(&format!("Failed to create profile: {err}")),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(SetupAdminResponse {
            success: true,
            message: "Admin user created successfully".to_string(),
            user_id: identity.id,
            email: identity.email,
        }),
    )
        .into_response()
}
