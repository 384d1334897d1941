//! File upload handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::error::AppError;
use crate::services::uploads::UploadedFile;
use crate::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub files: Vec<UploadedFile>,
}

/// Store every `file` part of a multipart upload
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();
    let mut saw_file_part = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        saw_file_part = true;
        let Some(name) = field.file_name().map(str::to_string).filter(|n| !n.is_empty()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?;
        files.push(state.uploads.save(&name, &bytes).await?);
    }

    if !saw_file_part {
        return Err(AppError::validation("file", "No file part"));
    }
    if files.is_empty() {
        return Err(AppError::validation("file", "Nothing saved"));
    }
    Ok(Json(UploadResponse { ok: true, files }))
}
