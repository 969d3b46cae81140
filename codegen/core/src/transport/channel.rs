//! Push channel state
//!
//! The push transport keeps at most one active channel. A new connection
//! replaces the previous one; a disconnect clears the slot only if the slot
//! still holds that connection's channel.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::TransportError;
use crate::protocol::JsonRpcRequest;

/// Identifier of one push connection
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as sent to clients
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to one open push connection
///
/// Dropping the last handle closes the inbound queue, which stops the
/// connection's worker and in turn ends its event stream.
#[derive(Clone, Debug)]
pub struct PushChannel {
    session_id: SessionId,
    inbound: mpsc::Sender<JsonRpcRequest>,
}

impl PushChannel {
    /// Create a handle over a worker's inbound queue
    #[must_use]
    pub fn new(session_id: SessionId, inbound: mpsc::Sender<JsonRpcRequest>) -> Self {
        Self {
            session_id,
            inbound,
        }
    }

    /// This channel's session id
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Queue a request for the channel's worker
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] if the worker has stopped.
    pub async fn send(&self, request: JsonRpcRequest) -> Result<(), TransportError> {
        self.inbound
            .send(request)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }
}

/// The single active-channel slot
#[derive(Clone, Debug, Default)]
pub struct ActiveChannel {
    slot: Arc<RwLock<Option<PushChannel>>>,
}

impl ActiveChannel {
    /// Create an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `channel` the active one, returning the channel it replaced
    pub fn install(&self, channel: PushChannel) -> Option<PushChannel> {
        let previous = self.slot.write().replace(channel);
        if let Some(prev) = &previous {
            tracing::info!(replaced = %prev.session_id, "Replacing active push channel");
        }
        previous
    }

    /// Clear the slot if it still holds `session`; returns whether it did
    pub fn clear_if(&self, session: &SessionId) -> bool {
        let mut slot = self.slot.write();
        let owned = slot
            .as_ref()
            .is_some_and(|current| current.session_id == *session);
        if owned {
            *slot = None;
        }
        owned
    }

    /// A handle to the active channel, if any
    #[must_use]
    pub fn current(&self) -> Option<PushChannel> {
        self.slot.read().clone()
    }

    /// Clear the slot unconditionally
    pub fn close(&self) -> Option<PushChannel> {
        self.slot.write().take()
    }

    /// Whether a channel is active
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (PushChannel, mpsc::Receiver<JsonRpcRequest>) {
        let (tx, rx) = mpsc::channel(4);
        (PushChannel::new(SessionId::new(), tx), rx)
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::new().as_str().len(), 36);
    }

    #[test]
    fn test_install_replaces_and_returns_previous() {
        let active = ActiveChannel::new();
        let (first, _rx1) = channel();
        let (second, _rx2) = channel();
        let first_id = first.session_id().clone();

        assert!(active.install(first).is_none());
        let replaced = active.install(second.clone()).unwrap();
        assert_eq!(replaced.session_id(), &first_id);
        assert_eq!(active.current().unwrap().session_id(), second.session_id());
    }

    #[test]
    fn test_stale_disconnect_keeps_newer_channel() {
        let active = ActiveChannel::new();
        let (first, _rx1) = channel();
        let (second, _rx2) = channel();
        let first_id = first.session_id().clone();
        let second_id = second.session_id().clone();

        active.install(first);
        active.install(second);

        assert!(!active.clear_if(&first_id));
        assert!(active.is_active());
        assert!(active.clear_if(&second_id));
        assert!(!active.is_active());
    }

    #[tokio::test]
    async fn test_send_after_worker_gone_is_closed() {
        let (ch, rx) = channel();
        drop(rx);
        let err = ch
            .send(JsonRpcRequest::new(1, "ping", None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_dropping_last_handle_closes_queue() {
        let active = ActiveChannel::new();
        let (ch, mut rx) = channel();
        active.install(ch);
        active.close();
        assert!(rx.recv().await.is_none());
    }
}
