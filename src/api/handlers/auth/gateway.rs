//! The reusable admit-or-reject decision for privileged requests.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use crate::api::handlers::{error_body, extract_bearer_token};
use crate::supabase::{
    Identity, IdentityClient, IdentityError, Profile, Role, ServiceClient, ServiceError,
};

pub(crate) const CONFIGURATION_ERROR_MESSAGE: &str =
    "Server configuration error: REDAKTO_SUPABASE_SERVICE_ROLE_KEY is required";

/// Admitted caller: a verified identity whose profile role is `admin`.
///
/// Carries the caller's own access token so downstream store access stays
/// scoped to the caller instead of escalating to the privileged connector.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub identity: Identity,
    pub profile: Profile,
    pub access_token: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// The `Authorization` header was absent, malformed, or empty. Same
    /// external status as `InvalidToken`, kept separate for diagnostics.
    #[error("no access token provided")]
    MissingToken,
    /// The identity provider did not recognize the token.
    #[error("invalid or expired access token")]
    InvalidToken,
    /// Verified identity without the admin role (or without any profile row).
    #[error("admin role required")]
    Forbidden {
        user_id: Uuid,
        role: Option<Role>,
    },
    /// The privileged credential is absent. Never reported as "not admin".
    #[error("service-role key is not configured")]
    Configuration,
    /// The provider or the profile store failed in a way that is neither an
    /// auth outcome nor a configuration problem.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

/// Authenticate, then authorize.
///
/// 1. Extract the bearer token.
/// 2. Resolve it to an identity with the caller-scoped connector.
/// 3. Read the profile role through the privileged connector. A missing row
///    is `Forbidden` here; only the login path heals absent profiles.
/// 4. Admit when the role is `admin`.
///
/// # Errors
/// Every rejection is an [`AuthError`]; see the variants for the mapping.
pub async fn authorize(
    headers: &HeaderMap,
    identity: &IdentityClient,
    service: &ServiceClient,
) -> Result<AdminIdentity, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::MissingToken)?;

    let caller = identity.get_user(&token).await.map_err(|err| match err {
        IdentityError::InvalidToken | IdentityError::InvalidCredentials => AuthError::InvalidToken,
        other => AuthError::Upstream(other.to_string()),
    })?;

    let profile = match service.fetch_profile(caller.id).await {
        Ok(profile) => profile,
        Err(ServiceError::ProfileNotFound) => {
            return Err(AuthError::Forbidden {
                user_id: caller.id,
                role: None,
            })
        }
        Err(ServiceError::Configuration) => return Err(AuthError::Configuration),
        Err(other) => return Err(AuthError::Upstream(other.to_string())),
    };

    if !profile.role.is_admin() {
        return Err(AuthError::Forbidden {
            user_id: caller.id,
            role: Some(profile.role),
        });
    }

    Ok(AdminIdentity {
        identity: caller,
        profile,
        access_token: token,
    })
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingToken => {
                debug!("authorization header missing or empty");
                (
                    StatusCode::UNAUTHORIZED,
                    error_body("No access token provided"),
                )
                    .into_response()
            }
            Self::InvalidToken => {
                debug!("bearer token rejected by identity provider");
                (StatusCode::UNAUTHORIZED, error_body("Invalid token")).into_response()
            }
            Self::Forbidden { user_id, role } => {
                debug!(
                    %user_id,
                    role = role.map_or("none", Role::as_str),
                    "admin role required"
                );
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "error": "Forbidden: Admin role required",
                        "currentRole": role,
                    })),
                )
                    .into_response()
            }
            Self::Configuration => {
                // Misconfiguration must stay visible; folding it into 403
                // would mask an operational problem as a security decision.
                error!("service-role key is not configured; privileged role lookup is impossible");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body(CONFIGURATION_ERROR_MESSAGE),
                )
                    .into_response()
            }
            Self::Upstream(message) => {
                error!("authorization gateway upstream failure: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("An error occurred"),
                )
                    .into_response()
            }
        }
    }
}
