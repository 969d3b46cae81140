//! Remote Chat API Backend
//!
//! HTTP client for the hosted conversational API.
//!
//! # Remote API
//!
//! - `POST /files/upload` - multipart upload (`file` + `user`), returns file metadata
//! - `POST /chat-messages` - chat request, answered as a `data: `-prefixed
//!   newline-delimited event stream when `response_mode` is `streaming`
//!
//! Every request carries `Authorization: Bearer <api key>`. Error responses
//! carry a JSON body with a `message` field.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::traits::{ByteStream, ChatBackend, ChatCallError, UploadError, UploadedFileMetadata};
use crate::chat::ChatPayload;
use crate::config::BridgeConfig;

/// Remote chat backend client
#[derive(Clone)]
pub struct RemoteBackend {
    /// Base URL, without trailing slash
    base_url: String,
    /// API credential
    api_key: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl RemoteBackend {
    /// Create a new remote backend
    ///
    /// `timeout` of `None` keeps the HTTP client default (no overall timeout).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client: builder.build()?,
        })
    }

    /// Create from a resolved [`BridgeConfig`]
    ///
    /// # Errors
    ///
    /// See [`RemoteBackend::new`].
    pub fn from_config(config: &BridgeConfig) -> anyhow::Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.request_timeout,
        )
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn upload_url(&self) -> String {
        format!("{}/files/upload", self.base_url)
    }

    fn chat_url(&self) -> String {
        format!("{}/chat-messages", self.base_url)
    }

    /// Pull the remote's error message out of a failed response
    async fn remote_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    body
                }
            })
    }
}

/// Best-effort MIME type from the file extension
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ChatBackend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    async fn upload_file(
        &self,
        path: &Path,
        user: &str,
    ) -> Result<UploadedFileMetadata, UploadError> {
        let io_error = |source| UploadError::Io {
            path: path.display().to_string(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let len = file.metadata().await.map_err(io_error)?.len();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, len)
            .file_name(file_name.clone())
            .mime_str(mime_for(path))
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = Form::new().part("file", part).text("user", user.to_string());

        debug!(file = %file_name, size = len, user = user, "Uploading file");

        let response = self
            .http_client
            .post(self.upload_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::remote_message(response).await;
            warn!(status = status, message = %message, "File upload rejected");
            return Err(UploadError::Rejected { status, message });
        }

        let meta: UploadedFileMetadata = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        info!(file_id = %meta.id, name = %meta.name, size = meta.size, "File uploaded");
        Ok(meta)
    }

    async fn send_streaming(&self, payload: &ChatPayload) -> Result<ByteStream, ChatCallError> {
        debug!(
            user = %payload.user,
            files = payload.files.len(),
            query_len = payload.query.len(),
            "Sending chat request"
        );

        let response = self
            .http_client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| ChatCallError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::remote_message(response).await;
            warn!(status = status, message = %message, "Chat request rejected");
            return Err(ChatCallError::Rejected { status, message });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatCallError::Interrupted(e.to_string())));

        Ok(stream.boxed())
    }
}
