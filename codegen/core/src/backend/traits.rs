//! Chat Backend Traits
//!
//! Trait definitions for the remote conversational API. The Chat flow only
//! talks to [`ChatBackend`], so tests can substitute an in-memory backend and
//! the HTTP details stay in [`super::RemoteBackend`].
//!
//! # Design Philosophy
//!
//! The backend does no interpretation of the answer stream: it hands back the
//! raw bytes exactly as they arrive and leaves record framing to the
//! [`crate::chat::StreamAggregator`].

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::ChatPayload;

/// Raw response body chunks, in arrival order
pub type ByteStream = BoxStream<'static, Result<Bytes, ChatCallError>>;

/// File metadata returned by the remote API after an upload
///
/// Only `id` is consumed downstream; the rest is kept for logging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFileMetadata {
    /// Opaque file handle
    pub id: String,
    /// Original file name
    #[serde(default)]
    pub name: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// File extension as detected by the remote
    #[serde(default)]
    pub extension: Option<String>,
    /// MIME type as detected by the remote
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Uploading user/account id
    #[serde(default)]
    pub created_by: Option<String>,
    /// Unix timestamp of the upload
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Errors raised by [`ChatBackend::upload_file`]
#[derive(Debug, Error)]
pub enum UploadError {
    /// The local file could not be opened or inspected
    #[error("Failed to open {path}: {source}")]
    Io {
        /// Path that was attempted
        path: String,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The remote API answered with a non-success status
    #[error("File upload rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Message provided by the remote, or the status reason
        message: String,
    },

    /// The request never completed or the response was unreadable
    #[error("File upload failed: {0}")]
    Transport(String),
}

impl UploadError {
    /// Message to surface to protocol clients
    ///
    /// Prefers the remote-provided message and falls back to the full error.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors raised while calling the remote chat endpoint
#[derive(Debug, Error)]
pub enum ChatCallError {
    /// The remote API answered with a non-success status
    #[error("Chat request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Message provided by the remote, or the status reason
        message: String,
    },

    /// The request could not be sent
    #[error("Chat request failed: {0}")]
    Transport(String),

    /// The response stream broke before end-of-data
    #[error("Chat stream interrupted: {0}")]
    Interrupted(String),
}

impl ChatCallError {
    /// Message to surface to protocol clients
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Remote chat backend
///
/// Implement this trait to point the Chat flow at a different provider or at
/// a test double.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name (for logging)
    fn name(&self) -> &str;

    /// Upload a local file on behalf of `user`
    ///
    /// The file is streamed, never read fully into memory. A single attempt is
    /// made; failures surface immediately.
    async fn upload_file(
        &self,
        path: &Path,
        user: &str,
    ) -> Result<UploadedFileMetadata, UploadError>;

    /// Send a chat payload and get the raw streaming response body
    async fn send_streaming(&self, payload: &ChatPayload) -> Result<ByteStream, ChatCallError>;
}
