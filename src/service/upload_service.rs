use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::config::UploadConfig;
use crate::dto::upload_dto::UploadedFile;
use crate::util::error::{ServiceError, ServiceResult};
use crate::util::minio::{MinioError, ObjectStore};

const OBJECT_PREFIX: &str = "pharma-assure";

/// Content types accepted for upload and the extension each is stored under.
const ALLOWED_TYPES: [(&str, &str); 5] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("application/pdf", "pdf"),
];

/// One file taken off a multipart request.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Checks type and size, returning the extension to store the file under.
pub fn validate_upload(file: &IncomingFile, max_bytes: usize) -> ServiceResult<&'static str> {
    if file.bytes.is_empty() {
        return Err(ServiceError::InvalidInput("Uploaded file is empty".to_string()));
    }
    if file.bytes.len() > max_bytes {
        return Err(ServiceError::PayloadTooLarge(format!(
            "File exceeds the {} byte limit",
            max_bytes
        )));
    }
    let content_type = file.content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == content_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| ServiceError::InvalidInput(format!("Unsupported file type: {}", file.content_type)))
}

/// Public ids are flat object keys; anything with a path separator is refused.
pub fn validate_public_id(public_id: &str) -> ServiceResult<()> {
    let flat = public_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if public_id.is_empty() || public_id.starts_with('.') || !flat {
        return Err(ServiceError::InvalidInput(format!("Invalid public id: {}", public_id)));
    }
    Ok(())
}

fn storage_error(e: MinioError) -> ServiceError {
    match e {
        MinioError::ObjectNotFound(name) => ServiceError::NotFound(format!("File {} not found", name)),
        other => {
            error!("Object storage failure: {}", other);
            ServiceError::InternalError(format!("Storage error: {}", other))
        }
    }
}

#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload_one(&self, file: IncomingFile) -> ServiceResult<UploadedFile>;
    /// All files are validated before any is stored.
    async fn upload_many(&self, files: Vec<IncomingFile>) -> ServiceResult<Vec<UploadedFile>>;
    async fn delete(&self, public_id: &str) -> ServiceResult<()>;
    fn max_files(&self) -> usize;
}

pub struct UploadServiceImpl {
    pub store: Arc<dyn ObjectStore>,
    pub config: UploadConfig,
}

impl UploadServiceImpl {
    pub fn new(store: Arc<dyn ObjectStore>, config: UploadConfig) -> Self {
        Self { store, config }
    }

    async fn store_file(&self, file: IncomingFile, extension: &str) -> ServiceResult<UploadedFile> {
        let public_id = format!("{}-{}.{}", OBJECT_PREFIX, uuid::Uuid::new_v4().simple(), extension);
        let size = file.bytes.len();
        self.store
            .put_object(&public_id, file.bytes, Some(&file.content_type))
            .await
            .map_err(storage_error)?;
        info!(public_id = %public_id, size, "File uploaded");
        Ok(UploadedFile {
            url: self.store.object_url(&public_id),
            public_id,
            size,
            content_type: file.content_type,
            original_name: file.file_name,
        })
    }
}

#[async_trait]
impl UploadService for UploadServiceImpl {
    #[instrument(skip(self, file), fields(file_name = ?file.file_name, content_type = %file.content_type))]
    async fn upload_one(&self, file: IncomingFile) -> ServiceResult<UploadedFile> {
        let extension = validate_upload(&file, self.config.max_bytes)?;
        self.store_file(file, extension).await
    }

    #[instrument(skip(self, files), fields(count = files.len()))]
    async fn upload_many(&self, files: Vec<IncomingFile>) -> ServiceResult<Vec<UploadedFile>> {
        if files.is_empty() {
            return Err(ServiceError::InvalidInput("No files uploaded".to_string()));
        }
        if files.len() > self.config.max_files {
            warn!("Too many files in one upload");
            return Err(ServiceError::InvalidInput(format!(
                "At most {} files can be uploaded at once",
                self.config.max_files
            )));
        }
        let extensions = files
            .iter()
            .map(|file| validate_upload(file, self.config.max_bytes))
            .collect::<ServiceResult<Vec<_>>>()?;

        let mut uploaded = Vec::with_capacity(files.len());
        for (file, extension) in files.into_iter().zip(extensions) {
            uploaded.push(self.store_file(file, extension).await?);
        }
        Ok(uploaded)
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> ServiceResult<()> {
        validate_public_id(public_id)?;
        self.store.remove_object(public_id).await.map_err(storage_error)?;
        info!(public_id, "File deleted");
        Ok(())
    }

    fn max_files(&self) -> usize {
        self.config.max_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: &str, len: usize) -> IncomingFile {
        IncomingFile { file_name: Some("label.png".into()), content_type: content_type.into(), bytes: vec![7; len] }
    }

    #[test]
    fn test_accepted_types_map_to_extensions() {
        assert_eq!(validate_upload(&file("image/png", 10), 100).unwrap(), "png");
        assert_eq!(validate_upload(&file("image/jpeg", 10), 100).unwrap(), "jpg");
        assert_eq!(validate_upload(&file("application/pdf; charset=binary", 10), 100).unwrap(), "pdf");
    }

    #[test]
    fn test_rejected_uploads() {
        assert!(matches!(validate_upload(&file("text/html", 10), 100), Err(ServiceError::InvalidInput(_))));
        assert!(matches!(validate_upload(&file("image/png", 0), 100), Err(ServiceError::InvalidInput(_))));
        assert!(matches!(validate_upload(&file("image/png", 101), 100), Err(ServiceError::PayloadTooLarge(_))));
    }

    #[test]
    fn test_public_id_must_be_flat() {
        assert!(validate_public_id("pharma-assure-0a1b.png").is_ok());
        assert!(validate_public_id("../secrets").is_err());
        assert!(validate_public_id("a/b.png").is_err());
        assert!(validate_public_id("").is_err());
        assert!(validate_public_id(".env").is_err());
        assert!(validate_public_id("scan_2025.03-01.pdf").is_ok());
        assert!(validate_public_id("a\\b.png").is_err());
        assert!(validate_public_id("résumé.pdf").is_err());
    }
}
