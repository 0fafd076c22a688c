//! API handlers and shared utilities for Redakto.
//!
//! This module organizes the service's route handlers and provides common
//! functions for bearer-token extraction and request validation.

pub mod auth;
pub mod blogs;
pub mod events;
pub mod health;
pub mod root;
pub mod settings;
pub mod upload;

use axum::{
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;
use utoipa::ToSchema;

/// `{"success": true}` acknowledgement shared by several endpoints.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub(crate) fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Pull the bearer token out of the `Authorization` header.
///
/// Returns `None` for a missing header, a non-bearer scheme, or an empty
/// token; the caller decides how that maps to a response.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Standard `{"error": ...}` body used across the API.
pub(crate) fn error_body(message: &str) -> Json<Value> {
    Json(json!({ "error": message }))
}

/// Lightweight email sanity check used before contacting the provider.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Image references may be absolute URLs or site-relative paths.
pub(crate) fn valid_image_url(value: &str) -> bool {
    value.starts_with('/') || Url::parse(value).is_ok()
}

/// `HH:MM`, 24-hour clock.
pub(crate) fn valid_start_time(value: &str) -> bool {
    Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").is_ok_and(|re| re.is_match(value))
}

/// Content dates travel as `YYYY-MM-DD` strings.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
