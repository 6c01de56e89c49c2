//! Direct-to-storage upload port.
//!
//! The backend hands out a presigned target; the file bytes go straight to
//! object storage without passing through the gateway.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::GatewayError;

/// A presigned, time-limited upload target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresignedUpload {
    /// `PUT` the raw bytes to `upload_url`; the object lands at `file_key`.
    Put { upload_url: String, file_key: String },
    /// `POST` a multipart form: every field first, then the file part.
    Form {
        upload_url: String,
        fields: BTreeMap<String, String>,
    },
}

impl PresignedUpload {
    /// Object key the upload will land at, when the backend disclosed it.
    pub fn object_key(&self) -> Option<&str> {
        match self {
            PresignedUpload::Put { file_key, .. } => Some(file_key),
            PresignedUpload::Form { fields, .. } => fields.get("key").map(String::as_str),
        }
    }
}

#[async_trait]
pub trait UploadPort: Send + Sync {
    async fn upload(
        &self,
        target: &PresignedUpload,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), GatewayError>;
}
