//! Chat Flow
//!
//! The one piece of business logic shared by every entry point:
//!
//! ```text
//! ChatRequest ──► upload image? ──► build_payload ──► send_streaming ──► StreamAggregator
//!                 (UploadError)                       (ChatCallError)    AggregationResult
//! ```
//!
//! Transports differ only in the [`CallerKind`] they pass and in how they
//! wrap the result.

mod aggregator;
mod request;

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use aggregator::{AggregateEvent, AggregationResult, StreamAggregator, DATA_PREFIX};
pub use request::{
    build_payload, CallerKind, ChatPayload, ChatRequest, FileKind, FileReference, ResponseMode,
    TransferMethod, ValidationError,
};

use crate::backend::{ChatBackend, ChatCallError, UploadError};

/// Failures of a chat flow run
#[derive(Debug, Error)]
pub enum ChatFlowError {
    /// The image upload failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The chat call failed or its stream broke
    #[error(transparent)]
    Chat(#[from] ChatCallError),
}

/// Upload + request build + remote call + aggregation
#[derive(Clone)]
pub struct ChatFlow {
    backend: Arc<dyn ChatBackend>,
}

impl ChatFlow {
    /// Create a flow over the given backend
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Run the flow and return the aggregated answer
    ///
    /// # Errors
    ///
    /// Returns [`ChatFlowError::Upload`] if the image upload fails and
    /// [`ChatFlowError::Chat`] if the chat call fails. An error *record* in
    /// the answer stream is not an error here; it yields a result with
    /// `is_error` set.
    pub async fn ask(
        &self,
        request: &ChatRequest,
        caller: CallerKind,
    ) -> Result<AggregationResult, ChatFlowError> {
        self.run(request, caller, None).await
    }

    /// Run the flow, forwarding each [`AggregateEvent`] as it is recognized
    ///
    /// Events are best-effort: a dropped receiver does not stop aggregation.
    ///
    /// # Errors
    ///
    /// See [`ChatFlow::ask`].
    pub async fn ask_streaming(
        &self,
        request: &ChatRequest,
        caller: CallerKind,
        events: mpsc::Sender<AggregateEvent>,
    ) -> Result<AggregationResult, ChatFlowError> {
        self.run(request, caller, Some(&events)).await
    }

    async fn run(
        &self,
        request: &ChatRequest,
        caller: CallerKind,
        events: Option<&mpsc::Sender<AggregateEvent>>,
    ) -> Result<AggregationResult, ChatFlowError> {
        let user = caller.user_id();

        let file = match request.image_file_path() {
            Some(path) => {
                let uploaded = self.backend.upload_file(path, user).await.map_err(|e| {
                    warn!(error = %e, path = %path.display(), "Image upload failed");
                    e
                })?;
                Some(FileReference::image(&uploaded))
            }
            None => None,
        };

        let payload = build_payload(request, file, caller);
        info!(
            backend = self.backend.name(),
            user = user,
            with_image = !payload.files.is_empty(),
            "Starting chat call"
        );

        let mut stream = self.backend.send_streaming(&payload).await?;
        let mut aggregator = StreamAggregator::new();
        let mut chunk_count: u32 = 0;

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| {
                warn!(
                    error = %e,
                    chunks_received = chunk_count,
                    text_so_far_len = aggregator.text().len(),
                    "Answer stream broke"
                );
                e
            })?;
            chunk_count += 1;

            for event in aggregator.push(&bytes) {
                forward(events, event).await;
            }
        }

        if let Some(event) = aggregator.finish() {
            forward(events, event).await;
        }

        debug!(total_chunks = chunk_count, "Answer stream ended");
        Ok(aggregator.into_result())
    }
}

async fn forward(events: Option<&mpsc::Sender<AggregateEvent>>, event: AggregateEvent) {
    if let Some(tx) = events {
        // Receiver gone means nobody is rendering; keep aggregating regardless
        let _ = tx.send(event).await;
    }
}
