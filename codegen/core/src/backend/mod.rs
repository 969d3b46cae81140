//! Remote Chat Backend Integration
//!
//! Abstracted access to the hosted conversational API through a common trait.
//!
//! # Usage
//!
//! ```ignore
//! use codegen_core::backend::{ChatBackend, RemoteBackend};
//!
//! let backend = RemoteBackend::new("https://api.dify.ai/v1", api_key, None)?;
//! let meta = backend.upload_file(Path::new("/tmp/mockup.png"), "cli-user").await?;
//! let stream = backend.send_streaming(&payload).await?;
//! ```

mod remote;
mod traits;

pub use remote::RemoteBackend;
pub use traits::{ByteStream, ChatBackend, ChatCallError, UploadError, UploadedFileMetadata};
