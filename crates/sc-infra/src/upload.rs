//! Direct-to-storage upload of receipt archives.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use sc_core::ports::{GatewayError, PresignedUpload, UploadPort};

use crate::http::error_message;

const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Sends archive bytes to a presigned object-storage target.
///
/// No API key is attached; the presigned URL carries its own authorization.
pub struct PresignedUploader {
    client: Client,
}

impl PresignedUploader {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UploadPort for PresignedUploader {
    async fn upload(
        &self,
        target: &PresignedUpload,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), GatewayError> {
        let size = bytes.len();
        let request = match target {
            PresignedUpload::Put { upload_url, .. } => self
                .client
                .put(upload_url)
                .header(reqwest::header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
                .body(bytes),
            PresignedUpload::Form { upload_url, fields } => {
                // Storage expects the policy fields before the file part.
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                let file = Part::bytes(bytes)
                    .file_name(file_name.to_string())
                    .mime_str(ARCHIVE_CONTENT_TYPE)
                    .map_err(|e| GatewayError::Transport(e.to_string()))?;
                self.client.post(upload_url).multipart(form.part("file", file))
            }
        };
        // The presigned URL carries a signature; only the object key is logged.
        debug!(file = file_name, size, key = ?target.object_key(), "uploading archive");

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.without_url().to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        info!(file = file_name, size, key = ?target.object_key(), "archive uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use mockito::Matcher;

    #[tokio::test]
    async fn put_target_receives_raw_bytes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/bucket/0007/receipts/batch.zip")
            .match_header("content-type", "application/zip")
            .match_header("x-api-key", Matcher::Missing)
            .match_body("PK-archive")
            .with_status(200)
            .create_async()
            .await;

        let target = PresignedUpload::Put {
            upload_url: format!("{}/bucket/0007/receipts/batch.zip", server.url()),
            file_key: "0007/receipts/batch.zip".into(),
        };
        PresignedUploader::new(Duration::from_secs(5))
            .unwrap()
            .upload(&target, "batch.zip", b"PK-archive".to_vec())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn form_target_sends_fields_then_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".into()),
            )
            .match_body(Matcher::Regex(
                r#"(?s)name="key".*0007/receipts/batch\.zip.*name="policy".*abc.*name="file"; filename="batch\.zip""#
                    .into(),
            ))
            .with_status(204)
            .create_async()
            .await;

        let fields = BTreeMap::from([
            ("key".to_string(), "0007/receipts/batch.zip".to_string()),
            ("policy".to_string(), "abc".to_string()),
        ]);
        let target = PresignedUpload::Form {
            upload_url: format!("{}/upload", server.url()),
            fields,
        };
        PresignedUploader::new(Duration::from_secs(5))
            .unwrap()
            .upload(&target, "batch.zip", b"PK\x03\x04".to_vec())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_upload_reports_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/expired")
            .with_status(403)
            .with_body("Request has expired")
            .create_async()
            .await;

        let target = PresignedUpload::Put {
            upload_url: format!("{}/expired", server.url()),
            file_key: "k".into(),
        };
        let err = PresignedUploader::new(Duration::from_secs(5))
            .unwrap()
            .upload(&target, "batch.zip", vec![0])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::Status {
                status: 403,
                message: "Request has expired".into()
            }
        );
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_presigned_url() {
        let target = PresignedUpload::Put {
            upload_url: "http://127.0.0.1:9/bucket/batch.zip?X-Amz-Signature=deadbeef".into(),
            file_key: "0007/receipts/batch.zip".into(),
        };
        let err = PresignedUploader::new(Duration::from_secs(2))
            .unwrap()
            .upload(&target, "batch.zip", b"PK".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(!err.to_string().contains("deadbeef"));
    }
}
