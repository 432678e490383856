//! services/api/src/web/uploads.rs
//!
//! Media uploads for lessons and sections. Files are checked against the upload
//! policy before any bytes are handed to object storage.

use crate::error::{http_error, port_error, upload_error, ErrorBody, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use lesson_studio_core::media::{extension_of, MediaKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// The response payload sent after a file has been stored.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Public URL to put into the lesson or section form.
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

/// Upload a media file.
///
/// Accepts a multipart/form-data request; the first part carrying a file is stored.
/// `kind` is one of `audio`, `video`, `image` or `document`.
#[utoipa::path(
    post,
    path = "/uploads/{kind}",
    params(("kind" = String, Path, description = "audio, video, image or document")),
    request_body(content_type = "multipart/form-data", description = "The file to upload."),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing file or unknown kind", body = ErrorBody),
        (status = 413, description = "File exceeds the upload limit", body = ErrorBody),
        (status = 415, description = "Content type does not match the kind", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let kind: MediaKind = kind.parse().map_err(upload_error)?;

    loop {
        let field = multipart.next_field().await.map_err(|e| {
            warn!("Failed to read multipart data: {}", e);
            http_error(e.status(), "bad_request", e.body_text())
        })?;
        let Some(field) = field else {
            return Err(http_error(
                StatusCode::BAD_REQUEST,
                "bad_request",
                "Multipart form must include a file",
            ));
        };
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| {
            warn!("Failed to read file bytes: {}", e);
            http_error(e.status(), "bad_request", e.body_text())
        })?;

        let stored = store_upload(&app_state, kind, &file_name, &content_type, data).await?;
        return Ok((StatusCode::CREATED, Json(stored)));
    }
}

/// Checks the file against the upload policy and, if accepted, stores it
/// under a fresh name.
pub async fn store_upload(
    app_state: &AppState,
    kind: MediaKind,
    file_name: &str,
    content_type: &str,
    data: Bytes,
) -> Result<UploadResponse, HttpError> {
    app_state
        .upload_policy()
        .check(kind, content_type, data.len())
        .map_err(|e| {
            warn!("Rejected {} upload '{}': {}", kind, file_name, e);
            upload_error(e)
        })?;

    let object_name = match extension_of(file_name) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    };
    let size = data.len();
    let url = app_state
        .storage
        .put_object(kind, &object_name, content_type, data)
        .await
        .map_err(|e| port_error("Failed to store upload", e))?;

    info!("Stored {} upload '{}' as {}", kind, file_name, object_name);
    Ok(UploadResponse {
        url,
        size,
        content_type: content_type.to_string(),
    })
}
