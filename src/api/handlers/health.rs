use crate::supabase::{IdentityClient, ServiceClient};
use crate::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    identity_provider: String,
    service_credential: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Identity provider is reachable", body = Health),
        (status = 503, description = "Identity provider is unreachable", body = Health)
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(
    method: Method,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
) -> impl IntoResponse {
    let provider_ok = identity.health().await;

    // Reported for operators; a missing key does not fail the probe because
    // the service still serves public reads without it.
    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        identity_provider: if provider_ok {
            "ok".to_string()
        } else {
            "error".to_string()
        },
        service_credential: if service.is_configured() {
            "configured".to_string()
        } else {
            "missing".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    // Create headers using the map method
    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    // Unwrap the headers or provide a default value (empty headers) in case of an error
    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    if provider_ok {
        debug!("Identity provider is healthy");
        (StatusCode::OK, headers, body)
    } else {
        debug!("Identity provider is unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
