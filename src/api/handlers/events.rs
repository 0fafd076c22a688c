//! Event CRUD plus the public "upcoming" listing. Same gate as blogs: reads
//! are public, mutations run the gateway and write with the caller's token.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;
use url::Url;
use utoipa::ToSchema;

use super::auth::gateway::authorize;
use super::blogs::{validate_image_url, validate_uuid_list, validation_error, valid_uuid, IdQuery};
use super::{error_body, parse_date, valid_start_time, SuccessResponse};
use crate::supabase::{ContentClient, ContentError, IdentityClient, ServiceClient};

const MAX_TITLE_CHARS: usize = 500;
const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_VENUE_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BuyTicketLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub date: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub start_time: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub related_events: Vec<String>,
    #[serde(default)]
    pub buy_ticket_links: Vec<BuyTicketLink>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub id: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub start_time: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub related_events: Option<Vec<String>>,
    pub buy_ticket_links: Option<Vec<BuyTicketLink>>,
}

#[utoipa::path(
    get,
    path = "/events",
    params(("id" = Option<String>, Query, description = "Return a single event instead of the list")),
    responses(
        (status = 200, description = "All events (newest first) or a single event"),
        (status = 404, description = "No event with that id"),
        (status = 500, description = "Content store error"),
    ),
    tag = "content"
)]
pub async fn list(
    Query(query): Query<IdQuery>,
    content: Extension<ContentClient>,
) -> impl IntoResponse {
    match query.id {
        Some(id) => match content.get("events", &id).await {
            Ok(row) => (StatusCode::OK, Json(row)).into_response(),
            Err(ContentError::NotFound) => {
                (StatusCode::NOT_FOUND, error_body("Event not found")).into_response()
            }
            Err(err) => {
                error!("failed to fetch event: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Failed to fetch event"),
                )
                    .into_response()
            }
        },
        None => match content.list("events", "date.desc").await {
            Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
            Err(err) => {
                error!("failed to list events: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Failed to fetch events"),
                )
                    .into_response()
            }
        },
    }
}

#[utoipa::path(
    get,
    path = "/events/upcoming",
    responses(
        (status = 200, description = "Events dated today or later, soonest first"),
        (status = 500, description = "Content store error"),
    ),
    tag = "content"
)]
pub async fn upcoming(content: Extension<ContentClient>) -> impl IntoResponse {
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

    match content.list_upcoming_events(&today).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("failed to list upcoming events: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to fetch upcoming events"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created"),
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

    let request: CreateEventRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => return validation_error(vec![err.to_string()]),
    };

    let row = match build_insert_row(&request) {
        Ok(row) => row,
        Err(details) => return validation_error(details),
    };

    match content.insert("events", &admin.access_token, &row).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => {
            error!("failed to create event: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to create event"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/events",
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated"),
        (status = 400, description = "Validation error or missing id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No event with that id"),
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

    let request: UpdateEventRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => return validation_error(vec![err.to_string()]),
    };

    let Some(id) = request.id.as_deref().and_then(valid_uuid) else {
        return (StatusCode::BAD_REQUEST, error_body("Event ID is required")).into_response();
    };

    let changes = match build_update_changes(&request) {
        Ok(changes) => changes,
        Err(details) => return validation_error(details),
    };

    match content
        .update("events", &admin.access_token, &id, &changes)
        .await
    {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(ContentError::NotFound) => {
            (StatusCode::NOT_FOUND, error_body("Event not found")).into_response()
        }
        Err(err) => {
            error!("failed to update event: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to update event"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/events",
    params(("id" = String, Query, description = "Event to delete")),
    responses(
        (status = 200, description = "Event deleted", body = SuccessResponse),
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
        return (StatusCode::BAD_REQUEST, error_body("Event ID is required")).into_response();
    };

    match content.delete("events", &admin.access_token, &id).await {
        Ok(()) => (StatusCode::OK, SuccessResponse::ok()).into_response(),
        Err(err) => {
            error!("failed to delete event: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to delete event"),
            )
                .into_response()
        }
    }
}

fn build_insert_row(request: &CreateEventRequest) -> Result<Value, Vec<String>> {
    let mut errors = Vec::new();
    let mut row = Map::new();

    match request.date.as_deref().and_then(parse_date) {
        Some(date) => {
            row.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        }
        None => errors.push("Date must be a valid date (YYYY-MM-DD)".to_string()),
    }

    match required_capped(request.title.as_deref(), MAX_TITLE_CHARS) {
        Some(title) => {
            row.insert("title".to_string(), json!(title));
        }
        None => errors.push("Title is required and must be at most 500 characters".to_string()),
    }

    match required_capped(request.description.as_deref(), MAX_DESCRIPTION_CHARS) {
        Some(description) => {
            row.insert("description".to_string(), json!(description));
        }
        None => errors
            .push("Description is required and must be at most 2000 characters".to_string()),
    }

    match required_capped(request.venue.as_deref(), MAX_VENUE_CHARS) {
        Some(venue) => {
            row.insert("venue".to_string(), json!(venue));
        }
        None => errors.push("Venue is required and must be at most 500 characters".to_string()),
    }

    match request.start_time.as_deref() {
        Some(start_time) if valid_start_time(start_time) => {
            row.insert("start_time".to_string(), json!(start_time));
        }
        _ => errors.push("Must be a valid time (HH:MM format)".to_string()),
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

    match validate_uuid_list(&request.related_events) {
        Ok(value) => {
            row.insert("related_events".to_string(), value);
        }
        Err(message) => errors.push(message),
    }

    match validate_ticket_links(&request.buy_ticket_links) {
        Ok(value) => {
            row.insert("buy_ticket_links".to_string(), value);
        }
        Err(message) => errors.push(message),
    }

    if errors.is_empty() {
        Ok(Value::Object(row))
    } else {
        Err(errors)
    }
}

fn build_update_changes(request: &UpdateEventRequest) -> Result<Value, Vec<String>> {
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
        match required_capped(Some(title), MAX_TITLE_CHARS) {
            Some(title) => {
                changes.insert("title".to_string(), json!(title));
            }
            None => {
                errors.push("Title is required and must be at most 500 characters".to_string());
            }
        }
    }

    if let Some(description) = request.description.as_deref() {
        match required_capped(Some(description), MAX_DESCRIPTION_CHARS) {
            Some(description) => {
                changes.insert("description".to_string(), json!(description));
            }
            None => errors
                .push("Description is required and must be at most 2000 characters".to_string()),
        }
    }

    if let Some(venue) = request.venue.as_deref() {
        match required_capped(Some(venue), MAX_VENUE_CHARS) {
            Some(venue) => {
                changes.insert("venue".to_string(), json!(venue));
            }
            None => {
                errors.push("Venue is required and must be at most 500 characters".to_string());
            }
        }
    }

    if let Some(start_time) = request.start_time.as_deref() {
        if valid_start_time(start_time) {
            changes.insert("start_time".to_string(), json!(start_time));
        } else {
            errors.push("Must be a valid time (HH:MM format)".to_string());
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

    if let Some(related) = request.related_events.as_ref() {
        match validate_uuid_list(related) {
            Ok(value) => {
                changes.insert("related_events".to_string(), value);
            }
            Err(message) => errors.push(message),
        }
    }

    if let Some(links) = request.buy_ticket_links.as_ref() {
        match validate_ticket_links(links) {
            Ok(value) => {
                changes.insert("buy_ticket_links".to_string(), value);
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

fn required_capped(value: Option<&str>, max_chars: usize) -> Option<&str> {
    value.filter(|value| !value.is_empty() && value.chars().count() <= max_chars)
}

/// Empty lists become `null`, matching how the store models "no links".
fn validate_ticket_links(links: &[BuyTicketLink]) -> Result<Value, String> {
    if links.is_empty() {
        return Ok(Value::Null);
    }

    for link in links {
        if link.label.trim().is_empty() {
            return Err("Label is required".to_string());
        }
        if Url::parse(&link.url).is_err() {
            return Err("Must be a valid URL".to_string());
        }
    }

    Ok(json!(links))
}
