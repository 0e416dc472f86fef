use axum::{
    extract::{multipart::MultipartError, Json, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::BytesMut;
use std::sync::Arc;
use tracing::{debug, error};

use crate::dto::common::MessageResponse;
use crate::dto::upload_dto::{UploadEnvelope, UploadManyEnvelope};
use crate::service::upload_service::{IncomingFile, UploadService};
use crate::util::error::{HandlerError, HandlerErrorKind};

fn multipart_error(e: MultipartError) -> HandlerError {
    error!("Failed to read multipart body: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return HandlerError::new(HandlerErrorKind::PayloadTooLarge, "Upload exceeds the size limit");
    }
    HandlerError::bad_request("Invalid multipart body").with_details(e.body_text())
}

/// Reads every file part named `field`; other parts are skipped.
async fn read_files(multipart: &mut Multipart, field: &str) -> Result<Vec<IncomingFile>, HandlerError> {
    let mut files = Vec::new();
    while let Some(mut part) = multipart.next_field().await.map_err(multipart_error)? {
        let name = part.name().map(|s| s.to_string()).unwrap_or_default();
        if name != field {
            debug!(field = %name, "Skipping multipart field");
            continue;
        }
        let file_name = part.file_name().map(|s| s.to_string());
        let content_type = part
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let mut buf = BytesMut::new();
        while let Some(chunk) = part.chunk().await.map_err(multipart_error)? {
            buf.extend_from_slice(&chunk);
        }
        debug!(file_name = ?file_name, size = buf.len(), "Received file");
        files.push(IncomingFile { file_name, content_type, bytes: buf.to_vec() });
    }
    Ok(files)
}

pub async fn upload_single_handler(
    State(service): State<Arc<dyn UploadService>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut files = read_files(&mut multipart, "file").await?;
    if files.len() > 1 {
        return Err(HandlerError::bad_request("Only one file is accepted on this route"));
    }
    let file = files.pop().ok_or_else(|| HandlerError::bad_request("No file uploaded"))?;
    let uploaded = service.upload_one(file).await?;
    Ok((StatusCode::CREATED, Json(UploadEnvelope { success: true, file: uploaded })))
}

pub async fn upload_multiple_handler(
    State(service): State<Arc<dyn UploadService>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let files = read_files(&mut multipart, "files").await?;
    let uploaded = service.upload_many(files).await?;
    Ok((StatusCode::CREATED, Json(UploadManyEnvelope { success: true, files: uploaded })))
}

pub async fn delete_upload_handler(
    State(service): State<Arc<dyn UploadService>>,
    Path(public_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    service.delete(&public_id).await?;
    Ok(Json(MessageResponse::new("File deleted successfully")))
}
