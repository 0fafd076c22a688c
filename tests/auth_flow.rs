//! End-to-end handler tests for the authorization gateway and its call
//! sites.
//!
//! These tests stand up a mock provider (auth + data API behind one base
//! URL) and drive the real Axum router with `oneshot` requests, so every
//! assertion exercises the same code path production traffic takes.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use redakto::{
    api::{self, ServerConfig},
    cli::globals::{Environment, GlobalArgs},
    supabase::{ContentClient, IdentityClient, ServiceClient},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::PathBuf;
use tower::ServiceExt;
use wiremock::matchers::{header as header_match, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADMIN_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const ADMIN_TOKEN: &str = "admin-token";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new(provider: &MockServer, with_service_key: bool) -> Result<Self> {
        Self::with_config(provider, with_service_key, Environment::Development, None)
    }

    fn with_config(
        provider: &MockServer,
        with_service_key: bool,
        environment: Environment,
        upload_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut globals = GlobalArgs::new(provider.uri(), "anon-key".to_string());
        if with_service_key {
            globals.set_service_role_key(SecretString::from("service-key"));
        }

        let config = ServerConfig {
            environment,
            frontend_base_url: "http://localhost:3000".to_string(),
            upload_dir: upload_dir.unwrap_or_else(|| PathBuf::from("public")),
        };

        let router = api::router(
            IdentityClient::new(&globals)?,
            ServiceClient::new(&globals)?,
            ContentClient::new(&globals)?,
            config,
        )?;

        Ok(Self { router })
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("router call failed")?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Ok((status, value))
    }
}

async fn mock_get_user(server: &MockServer, token: &str, user_id: &str, email: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_match("authorization", format!("Bearer {token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user_id,
            "email": email
        })))
        .mount(server)
        .await;
}

async fn mock_invalid_tokens(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT"})))
        .mount(server)
        .await;
}

async fn mock_profile(server: &MockServer, user_id: &str, role: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{user_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": user_id, "role": role}
        ])))
        .mount(server)
        .await;
}

async fn mock_no_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

async fn mock_sign_in(server: &MockServer, token: &str, user_id: &str, email: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "refresh_token": "refresh-xyz",
            "user": {"id": user_id, "email": email}
        })))
        .mount(server)
        .await;
}

/// Expect exactly `hits` revocations; the drop-time verification is the
/// assertion that a session was (or was not) revoked.
async fn mock_sign_out(server: &MockServer, hits: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(hits)
        .mount(server)
        .await;
}

/// Guard mock: mutation endpoints must never be reached in denial tests.
async fn mock_no_content_writes(server: &MockServer) {
    for verb in ["POST", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/rest/v1/blogs"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(server)
            .await;
        Mock::given(method(verb))
            .and(path("/rest/v1/events"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn protected_endpoints_reject_missing_token_without_side_effects() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_no_content_writes(&provider).await;
    let app = TestApp::new(&provider, true)?;

    let cases = [
        ("POST", "/blogs", Some(json!({}))),
        ("PUT", "/blogs", Some(json!({}))),
        ("DELETE", "/blogs?id=3fa85f64-5717-4562-b3fc-2c963f66afa6", None),
        ("POST", "/events", Some(json!({}))),
        ("PUT", "/events", Some(json!({}))),
        ("DELETE", "/events?id=3fa85f64-5717-4562-b3fc-2c963f66afa6", None),
        ("GET", "/settings", None),
        ("PUT", "/settings", Some(json!({}))),
        ("POST", "/settings", Some(json!({"new_password": "secret123"}))),
        ("GET", "/auth/check", None),
    ];

    for (verb, uri, body) in cases {
        let (status, value) = app.request(verb, uri, None, body).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{verb} {uri}");
        assert!(
            value.get("error").is_some(),
            "{verb} {uri} should return only an error body"
        );
        assert!(value.get("id").is_none());
    }

    Ok(())
}

#[tokio::test]
async fn protected_endpoints_reject_invalid_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_invalid_tokens(&provider).await;
    mock_no_content_writes(&provider).await;
    let app = TestApp::new(&provider, true)?;

    let (status, _) = app
        .request("POST", "/blogs", Some("stale-token"), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request("GET", "/auth/check", Some("stale-token"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn non_admin_token_is_forbidden_and_writes_nothing() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_get_user(&provider, "user-token", ADMIN_ID, "mila@example.com").await;
    mock_profile(&provider, ADMIN_ID, "user").await;
    mock_no_content_writes(&provider).await;
    let app = TestApp::new(&provider, true)?;

    let (status, value) = app
        .request(
            "POST",
            "/events",
            Some("user-token"),
            Some(json!({"title": "Jazz"})),
        )
        .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(value["currentRole"], "user");

    let (status, _) = app.request("GET", "/settings", Some("user-token"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn first_login_provisions_profile_revokes_session_and_returns_403() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_sign_in(&provider, "fresh-token", ADMIN_ID, "u1@example.com").await;
    mock_no_profile(&provider).await;
    mock_sign_out(&provider, 1).await;

    // Exactly one provisioning insert, with the least-privileged role.
    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": ADMIN_ID, "role": "user"}
        ])))
        .expect(1)
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "u1@example.com", "password": "secret123"})),
        )
        .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(value["needsAdminAccess"], json!(true));
    assert!(value.get("session").is_none());

    Ok(())
}

#[tokio::test]
async fn second_login_does_not_provision_twice() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_sign_in(&provider, "fresh-token", ADMIN_ID, "u1@example.com").await;
    mock_profile(&provider, ADMIN_ID, "user").await;
    mock_sign_out(&provider, 1).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "u1@example.com", "password": "secret123"})),
        )
        .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(value["currentRole"], "user");
    assert_eq!(value.get("needsAdminAccess"), None);

    Ok(())
}

#[tokio::test]
async fn admin_login_returns_session_and_identity() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_sign_in(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_profile(&provider, ADMIN_ID, "admin").await;
    mock_sign_out(&provider, 0).await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "admin@example.com", "password": "secret123"})),
        )
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["session"]["access_token"], ADMIN_TOKEN);
    assert_eq!(value["user"]["email"], "admin@example.com");

    Ok(())
}

#[tokio::test]
async fn login_with_missing_fields_is_a_bad_request() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    let app = TestApp::new(&provider, true)?;

    let (status, _) = app
        .request("POST", "/auth/login", None, Some(json!({"email": "a@b.co"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request("POST", "/auth/login", None, Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "admin@example.com", "password": "wrong"})),
        )
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // The body must not reveal whether the email exists.
    assert_eq!(value["error"], "Invalid login credentials");

    Ok(())
}

#[tokio::test]
async fn check_reports_admin_and_non_admin_without_forbidding() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_get_user(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_profile(&provider, ADMIN_ID, "admin").await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app.request("GET", "/auth/check", Some(ADMIN_TOKEN), None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["isAdmin"], json!(true));
    assert_eq!(value["role"], "admin");
    assert_eq!(value["userId"], ADMIN_ID);

    let provider = MockServer::start().await;
    mock_get_user(&provider, "user-token", ADMIN_ID, "mila@example.com").await;
    mock_no_profile(&provider).await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app.request("GET", "/auth/check", Some("user-token"), None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["isAdmin"], json!(false));
    assert_eq!(value["role"], Value::Null);

    Ok(())
}

#[tokio::test]
async fn missing_service_key_is_a_500_never_a_silent_denial() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_get_user(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_sign_in(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_sign_out(&provider, 1).await;
    mock_no_content_writes(&provider).await;

    // The profile store must never be consulted without the key.
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, false)?;

    let (status, value) = app.request("GET", "/auth/check", Some(ADMIN_TOKEN), None).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(value["isAdmin"], json!(true));

    // Login: session issued, then revoked, then reported as a server error.
    let (status, _) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "admin@example.com", "password": "secret123"})),
        )
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Admin calls a protected endpoint: 500, no mutation.
    let (status, _) = app
        .request(
            "PUT",
            "/settings",
            Some(ADMIN_TOKEN),
            Some(json!({"first_name": "Mila"})),
        )
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app
        .request("POST", "/blogs", Some(ADMIN_TOKEN), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    Ok(())
}

#[tokio::test]
async fn public_reads_need_no_identity() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "b1", "title": "Hello"}
        ])))
        .mount(&provider)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;

    let (status, value) = app.request("GET", "/blogs", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value[0]["title"], "Hello");

    let (status, _) = app.request("GET", "/events", None, None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request("GET", "/events/upcoming", None, None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn admin_can_create_content_with_their_own_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_get_user(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_profile(&provider, ADMIN_ID, "admin").await;

    // The write must carry the caller's token, not a privileged credential.
    Mock::given(method("POST"))
        .and(path("/rest/v1/blogs"))
        .and(header_match("authorization", format!("Bearer {ADMIN_TOKEN}")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": "b1", "title": "Opening night"}
        ])))
        .expect(1)
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app
        .request(
            "POST",
            "/blogs",
            Some(ADMIN_TOKEN),
            Some(json!({
                "date": "2026-08-06",
                "title": "Opening night",
                "description": "A look back",
                "read_time": 4,
                "content": "Full text"
            })),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["title"], "Opening night");

    Ok(())
}

#[tokio::test]
async fn content_validation_failures_do_not_reach_the_store() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_get_user(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_profile(&provider, ADMIN_ID, "admin").await;
    mock_no_content_writes(&provider).await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app
        .request(
            "POST",
            "/events",
            Some(ADMIN_TOKEN),
            Some(json!({
                "date": "not-a-date",
                "title": "Jazz evening",
                "description": "Trio",
                "venue": "Main hall",
                "start_time": "25:00",
                "content": "Program"
            })),
        )
        .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Validation error");

    Ok(())
}

#[tokio::test]
async fn setup_admin_is_disabled_in_production() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    let app = TestApp::with_config(&provider, true, Environment::Production, None)?;

    let (status, _) = app
        .request(
            "POST",
            "/auth/setup-admin",
            None,
            Some(json!({"email": "admin@example.com", "password": "secret123"})),
        )
        .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn setup_admin_creates_identity_and_admin_profile() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .and(header_match("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ADMIN_ID,
            "email": "admin@example.com"
        })))
        .expect(1)
        .mount(&provider)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": ADMIN_ID, "role": "admin"}
        ])))
        .expect(1)
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;
    let (status, value) = app
        .request(
            "POST",
            "/auth/setup-admin",
            None,
            Some(json!({"email": "admin@example.com", "password": "secret123"})),
        )
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["userId"], ADMIN_ID);

    Ok(())
}

#[tokio::test]
async fn setup_admin_rolls_back_identity_when_profile_creation_fails() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ADMIN_ID,
            "email": "admin@example.com"
        })))
        .mount(&provider)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&provider)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/auth/v1/admin/users/{ADMIN_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;
    let (status, _) = app
        .request(
            "POST",
            "/auth/setup-admin",
            None,
            Some(json!({"email": "admin@example.com", "password": "secret123"})),
        )
        .await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

fn multipart_body(boundary: &str, folder: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(folder) = folder {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cover.png\"\r\n\
         Content-Type: image/png\r\n\r\nnot-really-a-png\r\n--{boundary}--\r\n"
    ));
    body
}

async fn upload_request(
    app: &TestApp,
    token: Option<&str>,
    folder: Option<&str>,
) -> Result<(StatusCode, Value)> {
    let boundary = "redakto-test-boundary";
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(multipart_body(boundary, folder)))?;

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .context("router call failed")?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, value))
}

#[tokio::test]
async fn upload_requires_admin_and_stores_the_file() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_get_user(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_profile(&provider, ADMIN_ID, "admin").await;

    let upload_dir = tempfile::tempdir()?;
    let app = TestApp::with_config(
        &provider,
        true,
        Environment::Development,
        Some(upload_dir.path().to_path_buf()),
    )?;

    // No token: rejected before anything is written.
    let (status, _) = upload_request(&app, None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(std::fs::read_dir(upload_dir.path())?.count(), 0);

    let (status, value) = upload_request(&app, Some(ADMIN_TOKEN), None).await?;
    assert_eq!(status, StatusCode::OK);
    let url = value["url"].as_str().context("url in response")?;
    assert!(url.starts_with("/images/"));

    let stored = upload_dir
        .path()
        .join(url.trim_start_matches('/'))
        .canonicalize()?;
    assert_eq!(std::fs::read(stored)?, b"not-really-a-png");

    Ok(())
}

#[tokio::test]
async fn upload_rejects_folder_names_that_leave_the_upload_dir() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;
    mock_get_user(&provider, ADMIN_TOKEN, ADMIN_ID, "admin@example.com").await;
    mock_profile(&provider, ADMIN_ID, "admin").await;

    let upload_dir = tempfile::tempdir()?;
    let app = TestApp::with_config(
        &provider,
        true,
        Environment::Development,
        Some(upload_dir.path().to_path_buf()),
    )?;

    let (status, value) = upload_request(&app, Some(ADMIN_TOKEN), Some("../escape")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Invalid folder name");
    assert_eq!(std::fs::read_dir(upload_dir.path())?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn logout_revokes_with_the_caller_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header_match("authorization", format!("Bearer {ADMIN_TOKEN}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&provider)
        .await;

    let app = TestApp::new(&provider, true)?;

    let (status, value) = app
        .request("POST", "/auth/logout", Some(ADMIN_TOKEN), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], json!(true));

    let (status, _) = app.request("POST", "/auth/logout", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}
