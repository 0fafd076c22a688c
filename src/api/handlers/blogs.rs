//! Blog CRUD. Reads are public; every mutation runs the gateway first and
//! then writes with the caller's own token, never the privileged key.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::gateway::authorize;
use super::{error_body, parse_date, valid_image_url, SuccessResponse};
use crate::supabase::{ContentClient, ContentError, IdentityClient, ServiceClient};

const MAX_TITLE_CHARS: usize = 500;
const MAX_DESCRIPTION_CHARS: usize = 2000;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBlogRequest {
    pub date: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub read_time: Option<i64>,
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub related_blogs: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBlogRequest {
    pub id: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub read_time: Option<i64>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub related_blogs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/blogs",
    params(("id" = Option<String>, Query, description = "Return a single blog instead of the list")),
    responses(
        (status = 200, description = "All blogs (newest first) or a single blog"),
        (status = 404, description = "No blog with that id"),
        (status = 500, description = "Content store error"),
    ),
    tag = "content"
)]
pub async fn list(
    Query(query): Query<IdQuery>,
    content: Extension<ContentClient>,
) -> impl IntoResponse {
    match query.id {
        Some(id) => match content.get("blogs", &id).await {
            Ok(row) => (StatusCode::OK, Json(row)).into_response(),
            Err(ContentError::NotFound) => {
                (StatusCode::NOT_FOUND, error_body("Blog not found")).into_response()
            }
            Err(err) => {
                error!("failed to fetch blog: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Failed to fetch blog"),
                )
                    .into_response()
            }
        },
        None => match content.list("blogs", "date.desc").await {
            Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
            Err(err) => {
                error!("failed to list blogs: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Failed to fetch blogs"),
                )
                    .into_response()
            }
        },
    }
}

#[utoipa::path(
    post,
    path = "/blogs",
    request_body = CreateBlogRequest,
    responses(
        (status = 201, description = "Blog created"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Content store error"),
    ),
    security(("bearer" = [])),
    tag = "content"
)]
pub async fn create(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
    content: Extension<ContentClient>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let admin = match authorize(&headers, &identity, &service).await {
        Ok(admin) => admin,
        Err(err) => return err.into_response(),
    };

    let request: CreateBlogRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => return validation_error(vec![err.to_string()]),
    };

    let row = match build_insert_row(&request) {
        Ok(row) => row,
        Err(details) => return validation_error(details),
    };

    match content.insert("blogs", &admin.access_token, &row).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => {
            error!("failed to create blog: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to create blog"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/blogs",
    request_body = UpdateBlogRequest,
    responses(
        (status = 200, description = "Blog updated"),
        (status = 400, description = "Validation error or missing id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No blog with that id"),
        (status = 500, description = "Content store error"),
    ),
    security(("bearer" = [])),
    tag = "content"
)]
pub async fn update(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
    content: Extension<ContentClient>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let admin = match authorize(&headers, &identity, &service).await {
        Ok(admin) => admin,
        Err(err) => return err.into_response(),
    };

    let request: UpdateBlogRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => return validation_error(vec![err.to_string()]),
    };

    let Some(id) = request.id.as_deref().and_then(valid_uuid) else {
        return (StatusCode::BAD_REQUEST, error_body("Blog ID is required")).into_response();
    };

    let changes = match build_update_changes(&request) {
        Ok(changes) => changes,
        Err(details) => return validation_error(details),
    };

    match content
        .update("blogs", &admin.access_token, &id, &changes)
        .await
    {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(ContentError::NotFound) => {
            (StatusCode::NOT_FOUND, error_body("Blog not found")).into_response()
        }
        Err(err) => {
            error!("failed to update blog: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to update blog"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/blogs",
    params(("id" = String, Query, description = "Blog to delete")),
    responses(
        (status = 200, description = "Blog deleted", body = SuccessResponse),
        (status = 400, description = "Missing id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Content store error"),
    ),
    security(("bearer" = [])),
    tag = "content"
)]
pub async fn remove(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
    content: Extension<ContentClient>,
    Query(query): Query<IdQuery>,
) -> impl IntoResponse {
    let admin = match authorize(&headers, &identity, &service).await {
        Ok(admin) => admin,
        Err(err) => return err.into_response(),
    };

    let Some(id) = query.id.as_deref().and_then(valid_uuid) else {
        return (StatusCode::BAD_REQUEST, error_body("Blog ID is required")).into_response();
    };

    match content.delete("blogs", &admin.access_token, &id).await {
        Ok(()) => (StatusCode::OK, SuccessResponse::ok()).into_response(),
        Err(err) => {
            error!("failed to delete blog: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to delete blog"),
            )
                .into_response()
        }
    }
}

pub(crate) fn validation_error(details: Vec<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Validation error",
            "details": details,
        })),
    )
        .into_response()
}

pub(crate) fn valid_uuid(value: &str) -> Option<String> {
    Uuid::parse_str(value.trim())
        .ok()
        .map(|uuid| uuid.to_string())
}

fn build_insert_row(request: &CreateBlogRequest) -> Result<Value, Vec<String>> {
    let mut errors = Vec::new();
    let mut row = Map::new();

    match request.date.as_deref().and_then(parse_date) {
        Some(date) => {
            row.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        }
        None => errors.push("Date must be a valid date (YYYY-MM-DD)".to_string()),
    }

    match non_empty_capped(request.title.as_deref(), MAX_TITLE_CHARS) {
        Ok(title) => {
            row.insert("title".to_string(), json!(title));
        }
        Err(()) => errors.push("Title is required and must be at most 500 characters".to_string()),
    }

    match non_empty_capped(request.description.as_deref(), MAX_DESCRIPTION_CHARS) {
        Ok(description) => {
            row.insert("description".to_string(), json!(description));
        }
        Err(()) => errors
            .push("Description is required and must be at most 2000 characters".to_string()),
    }

    match request.read_time {
        Some(read_time) if read_time > 0 => {
            row.insert("read_time".to_string(), json!(read_time));
        }
        _ => errors.push("Read time must be a positive integer".to_string()),
    }

    match request.content.as_deref().filter(|value| !value.is_empty()) {
        Some(content) => {
            row.insert("content".to_string(), json!(content));
        }
        None => errors.push("Content is required".to_string()),
    }

    match validate_image_url(request.image_url.as_deref()) {
        Ok(value) => {
            row.insert("image_url".to_string(), value);
        }
        Err(message) => errors.push(message),
    }

    match validate_uuid_list(&request.related_blogs) {
        Ok(value) => {
            row.insert("related_blogs".to_string(), value);
        }
        Err(message) => errors.push(message),
    }

    if errors.is_empty() {
        Ok(Value::Object(row))
    } else {
        Err(errors)
    }
}

fn build_update_changes(request: &UpdateBlogRequest) -> Result<Value, Vec<String>> {
    let mut errors = Vec::new();
    let mut changes = Map::new();

    if let Some(date) = request.date.as_deref() {
        match parse_date(date) {
            Some(date) => {
                changes.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
            }
            None => errors.push("Date must be a valid date (YYYY-MM-DD)".to_string()),
        }
    }

    if let Some(title) = request.title.as_deref() {
        match non_empty_capped(Some(title), MAX_TITLE_CHARS) {
            Ok(title) => {
                changes.insert("title".to_string(), json!(title));
            }
            Err(()) => {
                errors.push("Title is required and must be at most 500 characters".to_string());
            }
        }
    }

    if let Some(description) = request.description.as_deref() {
        match non_empty_capped(Some(description), MAX_DESCRIPTION_CHARS) {
            Ok(description) => {
                changes.insert("description".to_string(), json!(description));
            }
            Err(()) => errors
                .push("Description is required and must be at most 2000 characters".to_string()),
        }
    }

    if let Some(read_time) = request.read_time {
        if read_time > 0 {
            changes.insert("read_time".to_string(), json!(read_time));
        } else {
            errors.push("Read time must be a positive integer".to_string());
        }
    }

    if let Some(content) = request.content.as_deref() {
        if content.is_empty() {
            errors.push("Content is required".to_string());
        } else {
            changes.insert("content".to_string(), json!(content));
        }
    }

    if let Some(image_url) = request.image_url.as_deref() {
        match validate_image_url(Some(image_url)) {
            Ok(value) => {
                changes.insert("image_url".to_string(), value);
            }
            Err(message) => errors.push(message),
        }
    }

    if let Some(related) = request.related_blogs.as_ref() {
        match validate_uuid_list(related) {
            Ok(value) => {
                changes.insert("related_blogs".to_string(), value);
            }
            Err(message) => errors.push(message),
        }
    }

    if errors.is_empty() {
        Ok(Value::Object(changes))
    } else {
        Err(errors)
    }
}

fn non_empty_capped(value: Option<&str>, max_chars: usize) -> Result<&str, ()> {
    match value {
        Some(value) if !value.is_empty() && value.chars().count() <= max_chars => Ok(value),
        _ => Err(()),
    }
}

/// Empty strings become `null`, matching how the store models "no image".
pub(crate) fn validate_image_url(value: Option<&str>) -> Result<Value, String> {
    match value {
        None | Some("") => Ok(Value::Null),
        Some(url) if valid_image_url(url) => Ok(json!(url)),
        Some(_) => Err("Must be a valid URL or a relative path starting with /".to_string()),
    }
}

/// Empty lists become `null`, matching how the store models "no relations".
pub(crate) fn validate_uuid_list(values: &[String]) -> Result<Value, String> {
    if values.is_empty() {
        return Ok(Value::Null);
    }

    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        match Uuid::parse_str(value.trim()) {
            Ok(uuid) => ids.push(uuid.to_string()),
            Err(_) => return Err("Invalid UUID".to_string()),
        }
    }

    Ok(json!(ids))
}
