//! Chat Request Validation and Payload Building
//!
//! [`ChatRequest`] is the validated form of a tool invocation. [`build_payload`]
//! turns it into the wire body for `POST /chat-messages`; it is a pure
//! transformation with no I/O.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::backend::UploadedFileMetadata;

/// Validation failures for tool arguments
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Arguments were not a JSON object
    #[error("arguments must be an object")]
    NotAnObject,

    /// `query` was absent
    #[error("query is required")]
    MissingQuery,

    /// `query` was present but not a string
    #[error("query must be a string")]
    QueryNotString,

    /// `query` was the empty string
    #[error("query must not be empty")]
    EmptyQuery,

    /// `imageFilePath` was present but not a string
    #[error("imageFilePath must be a string")]
    ImagePathNotString,

    /// `imageFilePath` does not reference an existing file
    #[error("image file not found: {0}")]
    ImageNotFound(PathBuf),
}

/// Which entry point is calling the remote API
///
/// Each maps to a fixed user identifier sent with uploads and chat requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallerKind {
    /// Process-pipe (stdio) transport
    Pipe,
    /// HTTP push (SSE) transport
    Push,
    /// Command line
    Cli,
}

impl CallerKind {
    /// The fixed remote user identifier for this caller
    #[must_use]
    pub fn user_id(self) -> &'static str {
        match self {
            Self::Pipe => "pipe-user",
            Self::Push => "push-user",
            Self::Cli => "cli-user",
        }
    }
}

/// A validated chat request
///
/// Only constructible through [`ChatRequest::new`] or
/// [`ChatRequest::from_arguments`], both of which check the image path on
/// disk, so an unresolved path can never reach the remote API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    query: String,
    image_file_path: Option<PathBuf>,
}

impl ChatRequest {
    /// Validate a query and optional image path
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyQuery`] for an empty query and
    /// [`ValidationError::ImageNotFound`] if the path is not an existing file.
    pub async fn new(
        query: impl Into<String>,
        image_file_path: Option<PathBuf>,
    ) -> Result<Self, ValidationError> {
        let query = query.into();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }

        if let Some(ref path) = image_file_path {
            let is_file = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(ValidationError::ImageNotFound(path.clone()));
            }
        }

        Ok(Self {
            query,
            image_file_path,
        })
    }

    /// Validate raw tool-call arguments (`{query, imageFilePath?}`)
    ///
    /// A `null` `imageFilePath` is treated as absent.
    ///
    /// # Errors
    ///
    /// See [`ValidationError`].
    pub async fn from_arguments(arguments: &Value) -> Result<Self, ValidationError> {
        let args = arguments.as_object().ok_or(ValidationError::NotAnObject)?;

        let query = match args.get("query") {
            None | Some(Value::Null) => return Err(ValidationError::MissingQuery),
            Some(Value::String(q)) => q.clone(),
            Some(_) => return Err(ValidationError::QueryNotString),
        };

        let image_file_path = match args.get("imageFilePath") {
            None | Some(Value::Null) => None,
            Some(Value::String(p)) => Some(PathBuf::from(p)),
            Some(_) => return Err(ValidationError::ImagePathNotString),
        };

        Self::new(query, image_file_path).await
    }

    /// The query text
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The validated image path, if any
    #[must_use]
    pub fn image_file_path(&self) -> Option<&Path> {
        self.image_file_path.as_deref()
    }
}

/// Kind of uploaded file being referenced
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// An image file
    Image,
}

/// How the remote should resolve a file reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    /// The file was uploaded through `/files/upload`
    LocalFile,
}

/// Reference to a previously uploaded file
///
/// Only produced from [`UploadedFileMetadata`], never from client input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileReference {
    #[serde(rename = "type")]
    kind: FileKind,
    transfer_method: TransferMethod,
    upload_file_id: String,
}

impl FileReference {
    /// Reference an uploaded image
    #[must_use]
    pub fn image(uploaded: &UploadedFileMetadata) -> Self {
        Self {
            kind: FileKind::Image,
            transfer_method: TransferMethod::LocalFile,
            upload_file_id: uploaded.id.clone(),
        }
    }

    /// The remote file id
    #[must_use]
    pub fn upload_file_id(&self) -> &str {
        &self.upload_file_id
    }
}

/// Response mode requested from the remote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Newline-delimited event stream
    Streaming,
}

/// Wire body for `POST /chat-messages`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatPayload {
    /// User query
    pub query: String,
    /// Input variables (always empty here)
    pub inputs: Map<String, Value>,
    /// Zero or one file references
    pub files: Vec<FileReference>,
    /// Fixed user identifier of the calling transport
    pub user: String,
    /// Always [`ResponseMode::Streaming`]
    pub response_mode: ResponseMode,
}

/// Build the chat payload for a validated request
#[must_use]
pub fn build_payload(
    request: &ChatRequest,
    file: Option<FileReference>,
    caller: CallerKind,
) -> ChatPayload {
    ChatPayload {
        query: request.query.clone(),
        inputs: Map::new(),
        files: file.into_iter().collect(),
        user: caller.user_id().to_string(),
        response_mode: ResponseMode::Streaming,
    }
}
