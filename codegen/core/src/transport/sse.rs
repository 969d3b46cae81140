//! Push transport (server-sent events)
//!
//! ```text
//! GET  /sse                      ──► endpoint event, then one `message` event per response
//! POST /messages?sessionId=<id>  ──► 202, request queued for the active channel's worker
//! ```
//!
//! Only one channel is active at a time. Opening a new event stream replaces
//! the previous channel and closes its stream; dropping a stream clears the
//! slot if it still belongs to that stream.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::channel::{ActiveChannel, PushChannel, SessionId};
use super::TransportError;
use crate::protocol::{decode_message, Decoded, JsonRpcRequest, McpServer};

/// Event stream route
pub const SSE_PATH: &str = "/sse";
/// Message post route
pub const MESSAGES_PATH: &str = "/messages";

/// Default interval between keep-alive comments
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Shared state of the push transport
#[derive(Clone)]
pub struct PushState {
    server: Arc<McpServer>,
    active: ActiveChannel,
    capacity: usize,
    keep_alive: Duration,
}

impl PushState {
    /// Create state for `server`; `capacity` bounds each channel's queues
    #[must_use]
    pub fn new(server: Arc<McpServer>, capacity: usize) -> Self {
        Self {
            server,
            active: ActiveChannel::new(),
            capacity: capacity.max(1),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    /// Set the keep-alive interval of event streams
    ///
    /// A disconnected client is noticed on the next write, so this also
    /// bounds how long a dead channel stays active.
    #[must_use]
    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// The active-channel slot
    #[must_use]
    pub fn active(&self) -> &ActiveChannel {
        &self.active
    }

    /// Open a new channel, make it the active one and return its event stream
    fn connect(&self) -> ChannelStream {
        let session_id = SessionId::new();
        let (events_tx, events_rx) = mpsc::channel::<Event>(self.capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel::<JsonRpcRequest>(self.capacity);
        let endpoint = format!("{MESSAGES_PATH}?sessionId={session_id}");

        let worker = run_worker(Arc::clone(&self.server), inbound_rx, events_tx, endpoint)
            .instrument(info_span!("channel", session = %session_id));
        tokio::spawn(worker);

        self.active
            .install(PushChannel::new(session_id.clone(), inbound_tx));
        info!(session = %session_id, "Push channel opened");

        ChannelStream {
            inner: ReceiverStream::new(events_rx),
            _guard: DisconnectGuard {
                active: self.active.clone(),
                session_id,
            },
        }
    }
}

/// Build the push transport router
pub fn router(state: PushState) -> Router {
    Router::new()
        .route(SSE_PATH, get(open_channel))
        .route(MESSAGES_PATH, post(post_message))
        .with_state(state)
}

async fn open_channel(State(state): State<PushState>) -> impl IntoResponse {
    let keep_alive = KeepAlive::new().interval(state.keep_alive);
    Sse::new(state.connect()).keep_alive(keep_alive)
}

#[derive(Debug, Default, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<PushState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(channel) = state.active.current() else {
        warn!("Message posted with no active push channel");
        return TransportError::NoActiveChannel.into_response();
    };

    let request = match decode_message(&body) {
        Decoded::Request(request) => request,
        Decoded::Invalid(response) => {
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    if let Some(posted) = query.session_id.as_deref() {
        if posted != channel.session_id().as_str() {
            warn!(
                posted = posted,
                active = %channel.session_id(),
                "Session id mismatch, routing to the active channel"
            );
        }
    }

    match channel.send(request).await {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NoActiveChannel | Self::ConnectionClosed => StatusCode::BAD_REQUEST,
            Self::SerializationError(_) | Self::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Processes one channel's requests in order, writing responses as events
async fn run_worker(
    server: Arc<McpServer>,
    mut inbound: mpsc::Receiver<JsonRpcRequest>,
    events: mpsc::Sender<Event>,
    endpoint: String,
) {
    if events
        .send(Event::default().event("endpoint").data(endpoint))
        .await
        .is_err()
    {
        return;
    }

    while let Some(request) = inbound.recv().await {
        let Some(response) = server.handle_request(request).await else {
            continue;
        };

        let data = match serde_json::to_string(&response) {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "Failed to serialize response");
                continue;
            }
        };

        if events
            .send(Event::default().event("message").data(data))
            .await
            .is_err()
        {
            debug!("Event stream gone");
            break;
        }
    }

    debug!("Push channel worker stopped");
}

/// Event stream of one channel; clears the slot when dropped
struct ChannelStream {
    inner: ReceiverStream<Event>,
    _guard: DisconnectGuard,
}

impl Stream for ChannelStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx).map(|event| event.map(Ok))
    }
}

struct DisconnectGuard {
    active: ActiveChannel,
    session_id: SessionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self.active.clear_if(&self.session_id) {
            info!(session = %self.session_id, "Push channel disconnected");
        } else {
            debug!(session = %self.session_id, "Replaced push channel closed");
        }
    }
}
