use crate::{
    api::handlers::{auth, blogs, events, health, root, settings, upload},
    cli::globals::Environment,
    supabase::{ContentClient, IdentityClient, ServiceClient},
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::ApiDoc;

/// Uploads are capped at 5 MiB; leave headroom for multipart framing.
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub environment: Environment,
    pub frontend_base_url: String,
    pub upload_dir: PathBuf,
}

/// Build the full application router.
///
/// Kept separate from [`new`] so tests can drive the exact same router
/// without binding a socket.
///
/// # Errors
/// Returns an error if the frontend base URL cannot be turned into a CORS
/// origin.
pub fn router(
    identity: IdentityClient,
    service: ServiceClient,
    content: ContentClient,
    config: ServerConfig,
) -> Result<Router> {
    let frontend_origin = frontend_origin(&config.frontend_base_url)?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route("/auth/login", post(auth::login::login))
        .route("/auth/check", get(auth::check::check))
        .route("/auth/logout", post(auth::logout::logout))
        .route("/auth/setup-admin", post(auth::setup_admin::setup_admin))
        .route(
            "/settings",
            get(settings::get_settings)
                .put(settings::update_settings)
                .post(settings::change_password),
        )
        .route(
            "/blogs",
            get(blogs::list)
                .post(blogs::create)
                .put(blogs::update)
                .delete(blogs::remove),
        )
        .route(
            "/events",
            get(events::list)
                .post(events::create)
                .put(events::update)
                .delete(events::remove),
        )
        .route("/events/upcoming", get(events::upcoming))
        .route("/upload", post(upload::upload))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(Extension(identity))
                .layer(Extension(service))
                .layer(Extension(content))
                .layer(Extension(config)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    identity: IdentityClient,
    service: ServiceClient,
    content: ContentClient,
    config: ServerConfig,
) -> Result<()> {
    let app = router(identity, service, content, config)?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
