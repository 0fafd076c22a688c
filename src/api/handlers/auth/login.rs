//! Session issuance: credentials in, admin-checked session out.
//!
//! A session exists from the moment the provider accepts the credentials, so
//! every non-admin outcome after that point revokes it before responding.
//! Revocation is best-effort: a failed sign-out never upgrades a denial into
//! a success.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};
use tracing::{error, warn};

use super::gateway::CONFIGURATION_ERROR_MESSAGE;
use super::types::{LoginRequest, LoginResponse};
use crate::api::handlers::error_body;
use crate::supabase::{IdentityClient, IdentityError, ServiceClient, ServiceError, Session};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Admin session issued", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Authenticated but not an admin; the session has been revoked"),
        (status = 500, description = "Configuration or provider error"),
    ),
    tag = "auth"
)]
pub async fn login(
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
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

    // Step 1: validate credentials with the caller-scoped connector. The
    // rejection is uniform so callers cannot probe which emails exist.
    let (caller, session) = match identity.sign_in_with_password(email, password).await {
        Ok(ok) => ok,
        Err(IdentityError::InvalidCredentials) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_body("Invalid login credentials"),
            )
                .into_response()
        }
        Err(err) => {
            error!("sign-in failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("An error occurred during login"),
            )
                .into_response();
        }
    };

    // Step 2: make sure a profile row exists; first contact provisions one
    // with the least-privileged role.
    let (profile, freshly_provisioned) = match service.ensure_profile(&caller).await {
        Ok(ok) => ok,
        Err(ServiceError::Configuration) => {
            revoke_session(&identity, &session).await;
            error!("service-role key is not configured; revoked the freshly issued session");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(CONFIGURATION_ERROR_MESSAGE),
            )
                .into_response();
        }
        Err(err) => {
            revoke_session(&identity, &session).await;
            error!("profile provisioning failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to load user profile. Please contact support."),
            )
                .into_response();
        }
    };

    // Step 3: admit only admins. A brand-new profile can never be admin, so
    // the caller gets an actionable message instead of a bare denial.
    if freshly_provisioned {
        revoke_session(&identity, &session).await;
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Your account has been created, but admin privileges are required. \
                          Please contact an administrator to grant you admin access.",
                "needsAdminAccess": true,
            })),
        )
            .into_response();
    }

    if !profile.role.is_admin() {
        revoke_session(&identity, &session).await;
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": format!(
                    "Access denied. Admin privileges required. Your current role is: {}. \
                     Please contact an administrator.",
                    profile.role
                ),
                "currentRole": profile.role,
                "userId": caller.id,
            })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(LoginResponse {
            user: caller,
            session,
        }),
    )
        .into_response()
}

/// Best-effort revocation; failures are logged and the denial stands.
async fn revoke_session(identity: &IdentityClient, session: &Session) {
    if let Err(err) = identity.sign_out(&session.access_token).await {
        warn!("failed to revoke session after denied login: {err}");
    }
}
