use serde::{Deserialize, Serialize};

/// Upload metadata listed by `GET /patients/{id}/uploads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, alias = "created_at")]
    pub uploaded_at: Option<String>,
}

impl FileUpload {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Response of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub file_id: String,
}

/// Acknowledgement bodies of the form `{"message": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
