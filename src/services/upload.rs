use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::UserId;

/// Errors that can occur when talking to the image upload service
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Upload service rejected the image: {0}")]
    Rejected(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

/// Client for the external image upload endpoint.
///
/// Posts a multipart form with `image` and `userId` fields and expects
/// `{"imageUrl": "..."}` back.
pub struct UploadClient {
    endpoint: String,
    client: Client,
}

impl UploadClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload an image for `user_id`, returning the stored resource path
    pub async fn upload_image(
        &self,
        user_id: UserId,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let extension = image_extension(content_type)
            .ok_or_else(|| UploadError::UnsupportedContentType(content_type.to_string()))?;

        let part = Part::bytes(bytes)
            .file_name(format!("{}.{}", user_id, extension))
            .mime_str(content_type)?;
        let form = Form::new()
            .text("userId", user_id.to_string())
            .part("image", part);

        tracing::debug!("Uploading image for user {} to {}", user_id, self.endpoint);

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected(format!("{}: {}", status, body)));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        body.image_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| UploadError::InvalidResponse("missing imageUrl".into()))
    }
}

/// File extension for an accepted image content type
fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> UploadClient {
        UploadClient::new(format!("{}/upload", server.url()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_upload_returns_image_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data.*".into()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"imageUrl":"/uploads/7.png"}"#)
            .create_async()
            .await;

        let url = client_for(&server)
            .upload_image(7, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
            .await
            .unwrap();

        assert_eq!(url, "/uploads/7.png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_rejected_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .with_status(400)
            .with_body("Invalid file type")
            .create_async()
            .await;

        let err = client_for(&server)
            .upload_image(7, "image/png", vec![1, 2, 3])
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_upload_non_json_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body("saved")
            .create_async()
            .await;

        let err = client_for(&server)
            .upload_image(7, "image/jpeg", vec![1])
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_non_image_content_type_rejected_locally() {
        let server = mockito::Server::new_async().await;
        let err = client_for(&server)
            .upload_image(7, "text/plain", vec![1])
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::UnsupportedContentType(_)));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/PNG"), Some("png"));
        assert_eq!(image_extension("image/jpeg; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
    }
}
