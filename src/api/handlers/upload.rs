//! Image upload for content editors.
//!
//! The gateway runs before the multipart body is touched, so unauthenticated
//! callers cannot make the server buffer a file.

use axum::{
    extract::{Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::error;
use ulid::Ulid;
use utoipa::ToSchema;

use super::auth::gateway::authorize;
use super::error_body;
use crate::api::ServerConfig;
use crate::supabase::{IdentityClient, ServiceClient};

const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_FOLDER: &str = "images";
const DEFAULT_EXTENSION: &str = "bin";
const MAX_EXTENSION_CHARS: usize = 8;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
    pub path: String,
}

#[utoipa::path(
    post,
    path = "/upload",
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing file, wrong type, bad folder, or over 5 MiB"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Filesystem error"),
    ),
    security(("bearer" = [])),
    tag = "content"
)]
pub async fn upload(
    headers: HeaderMap,
    identity: Extension<IdentityClient>,
    service: Extension<ServiceClient>,
    config: Extension<ServerConfig>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &identity, &service).await {
        return err.into_response();
    }

    let mut file: Option<(String, String)> = None;
    let mut bytes = None;
    let mut folder = DEFAULT_FOLDER.to_string();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    error_body(&format!("Invalid multipart body: {err}")),
                )
                    .into_response()
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(data) => {
                        file = Some((content_type, file_name));
                        bytes = Some(data);
                    }
                    Err(err) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            error_body(&format!("Failed to read file: {err}")),
                        )
                            .into_response()
                    }
                }
            }
            "folder" => {
                if let Ok(value) = field.text().await {
                    if !value.is_empty() {
                        folder = value;
                    }
                }
            }
            _ => {}
        }
    }

    let (Some((content_type, file_name)), Some(bytes)) = (file, bytes) else {
        return (StatusCode::BAD_REQUEST, error_body("No file provided")).into_response();
    };

    if !content_type.starts_with("image/") {
        return (StatusCode::BAD_REQUEST, error_body("File must be an image")).into_response();
    }

    if bytes.len() > MAX_FILE_BYTES {
        return (
            StatusCode::BAD_REQUEST,
            error_body("File size must be less than 5MB"),
        )
            .into_response();
    }

    if !valid_folder(&folder) {
        return (StatusCode::BAD_REQUEST, error_body("Invalid folder name")).into_response();
    }

    let file_name = format!(
        "{}.{}",
        Ulid::new().to_string().to_lowercase(),
        sanitize_extension(&file_name)
    );

    let directory = config.upload_dir.join(&folder);
    if let Err(err) = tokio::fs::create_dir_all(&directory).await {
        error!("failed to create upload directory: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body("Failed to upload file"),
        )
            .into_response();
    }

    let path = directory.join(&file_name);
    if let Err(err) = tokio::fs::write(&path, &bytes).await {
        error!("failed to write uploaded file: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body("Failed to upload file"),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(UploadResponse {
            url: format!("/{folder}/{file_name}"),
            path: path.display().to_string(),
        }),
    )
        .into_response()
}

/// Folder names stay inside the upload directory: no separators, no dots.
fn valid_folder(folder: &str) -> bool {
    !folder.is_empty()
        && folder
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Keep the extension if it is a short alphanumeric suffix, else fall back.
fn sanitize_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .filter(|ext| {
            !ext.is_empty()
                && ext.chars().count() <= MAX_EXTENSION_CHARS
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext != file_name.to_lowercase().as_str()
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
