//! # Audio Upload Handler
//!
//! ## Endpoint: `POST /upload`
//!
//! ## Request:
//! Multipart form data with an audio file field named "audio"
//!
//! ## Response:
//! ```json
//! {
//!   "request_id": "5f2c1d0e-...",
//!   "status": "processing",
//!   "message": "File processing started. Use the request_id to check status."
//! }
//! ```
//!
//! The response is sent as soon as the provider acknowledges the job; the
//! client then polls `GET /status/{request_id}`.

use crate::error::{AppError, AppResult};
use crate::provider::AudioUpload;
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde_json::json;
use tracing::info;

const AUDIO_FIELD: &str = "audio";

pub async fn upload_audio(state: web::Data<AppState>, mut payload: Multipart) -> AppResult<HttpResponse> {
    let max_size = state.config.upload.max_file_size_bytes;
    let mut upload: Option<AudioUpload> = None;

    while let Some(item) = payload.next().await {
        let mut field: Field = item.map_err(|e| AppError::BadRequest(format!("File upload error: {}", e)))?;

        let (field_name, filename) = {
            let content_disposition = field
                .content_disposition()
                .ok_or_else(|| AppError::ValidationError("Missing content disposition".to_string()))?;
            (
                content_disposition.get_name().map(str::to_string),
                content_disposition.get_filename().map(str::to_string),
            )
        };

        if field_name.as_deref() != Some(AUDIO_FIELD) || upload.is_some() {
            drain(&mut field).await?;
            continue;
        }

        let mime_type = field.content_type().map(|mime| mime.essence_str().to_string()).unwrap_or_default();
        if !mime_type.starts_with("audio/") {
            return Err(AppError::ValidationError(format!(
                "Only audio files are allowed (got '{}')",
                if mime_type.is_empty() { "unknown" } else { mime_type.as_str() }
            )));
        }

        let bytes = read_limited(&mut field, max_size).await?;
        upload = Some(AudioUpload {
            filename: filename.unwrap_or_else(|| "unknown".to_string()),
            mime_type,
            bytes,
        });
    }

    let upload = upload.ok_or_else(|| AppError::ValidationError("No audio file provided".to_string()))?;
    if upload.bytes.is_empty() {
        return Err(AppError::ValidationError("Uploaded audio file is empty".to_string()));
    }

    info!(
        filename = %upload.filename,
        size_bytes = upload.bytes.len(),
        mime_type = %upload.mime_type,
        "Received audio upload"
    );

    let submission = state.submissions.submit(upload).await?;

    Ok(HttpResponse::Ok().json(json!({
        "request_id": submission.request_id,
        "status": "processing",
        "message": "File processing started. Use the request_id to check status."
    })))
}

/// Read a field into memory, refusing anything larger than `max_size`.
async fn read_limited(field: &mut Field, max_size: usize) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("File upload error: {}", e)))?;
        if bytes.len() + chunk.len() > max_size {
            return Err(AppError::ValidationError(format!(
                "File too large (max: {} bytes)",
                max_size
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Skip over a field we don't care about.
async fn drain(field: &mut Field) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::BadRequest(format!("File upload error: {}", e)))?;
    }
    Ok(())
}
