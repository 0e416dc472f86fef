use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    /// Object key inside the bucket; pass it back to `DELETE /api/upload/{publicId}`.
    pub public_id: String,
    pub size: usize,
    pub content_type: String,
    pub original_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadEnvelope {
    pub success: bool,
    #[serde(flatten)]
    pub file: UploadedFile,
}

#[derive(Debug, Serialize)]
pub struct UploadManyEnvelope {
    pub success: bool,
    pub files: Vec<UploadedFile>,
}
