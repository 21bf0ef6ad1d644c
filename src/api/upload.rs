//! Upload API endpoints
//!
//! Image uploads for blog content. Accepts multipart/form-data with a
//! single file field named "file", runs the blocking image pipeline off
//! the async runtime and records a row per stored file.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::UploadedFile;
use crate::services::image::{self, ImageError};

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: i64,
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub thumbnail_url: Option<String>,
}

/// Editor upload routes (behind `require_auth`)
pub fn editor_router() -> Router<AppState> {
    Router::new()
        .route("/image", post(upload_image))
        .route("/{id}", axum::routing::delete(delete_upload))
}

/// POST /api/v1/editor/upload/image
async fn upload_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to read file: {}", e)))?;

        let upload_dir = state.config.upload.dir.clone();
        let max_size_mb = state.config.upload.max_size_mb;

        // Decoding and re-encoding are CPU bound
        let saved = tokio::task::spawn_blocking(move || {
            image::validate_upload(&filename, &data, max_size_mb)?;
            image::save_image(&filename, &data, &upload_dir, true, true)
        })
        .await
        .map_err(|e| ApiError::internal_error(format!("Upload task failed: {}", e)))?
        .map_err(map_image_error)?;

        let record = UploadedFile {
            id: 0,
            filename: saved.filename.clone(),
            original_filename: Some(saved.original_filename.clone()),
            filepath: saved.filepath.to_string_lossy().into_owned(),
            file_size: Some(saved.file_size as i64),
            mime_type: mime_for(&saved.filename),
            uploaded_by: Some(user.0.id),
            uploaded_at: Utc::now(),
        };
        let record = state
            .upload_repo
            .create(&record)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to record upload: {}", e)))?;

        return Ok(Json(UploadResponse {
            id: record.id,
            url: format!("/uploads/{}", saved.filename),
            filename: saved.filename,
            size: saved.file_size,
            thumbnail_url: saved
                .thumbnail_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|name| format!("/uploads/{}", name.to_string_lossy())),
        }));
    }

    Err(ApiError::validation_error("No file field in request"))
}

/// DELETE /api/v1/editor/upload/{id}
///
/// Removes the database row, the stored file and its thumbnail. A
/// missing file on disk is not an error once the row is gone.
async fn delete_upload(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let record = state
        .upload_repo
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(format!("Upload lookup failed: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Upload not found"))?;

    state
        .upload_repo
        .delete(id)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete upload: {}", e)))?;

    let filepath = std::path::PathBuf::from(record.filepath);
    tokio::task::spawn_blocking(move || {
        image::delete_image(&filepath, true);
    })
    .await
    .map_err(|e| ApiError::internal_error(format!("Delete task failed: {}", e)))?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_image_error(err: ImageError) -> ApiError {
    match err {
        ImageError::TypeNotAllowed | ImageError::NoFile | ImageError::InvalidImage(_) => {
            ApiError::validation_error(err.to_string())
        }
        ImageError::TooLarge { .. } => ApiError::validation_error(err.to_string()),
        ImageError::Io(e) => ApiError::internal_error(format!("Image storage failed: {}", e)),
    }
}

fn mime_for(filename: &str) -> Option<String> {
    let ext = filename.rsplit_once('.')?.1.to_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime.to_string())
}
