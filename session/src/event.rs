use tokio::sync::mpsc::UnboundedSender;

use crate::delivery::TranscriptEntry;
use crate::gate::Gate;
use crate::store::EndedSnapshot;

/// Notifications for whatever renders the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Authoritative state or a local flag changed; re-read the view.
    SessionUpdated,
    /// The delivery queue revealed one transcript entry.
    MessageRevealed(TranscriptEntry),
    CheckpointOpened(Gate),
    CheckpointClosed(Gate),
    /// The composing indicator toggled.
    BusyChanged(bool),
    /// A step or start call failed. Input stays disabled until the error is
    /// cleared.
    Fatal(String),
    /// The game reached ENDED; carries the payload for the results view.
    Ended(Box<EndedSnapshot>),
}

#[derive(Clone, Debug)]
pub struct EventSender {
    event_tx: Option<UnboundedSender<SessionEvent>>,
}

impl EventSender {
    pub fn new(event_tx: UnboundedSender<SessionEvent>) -> Self {
        Self {
            event_tx: Some(event_tx),
        }
    }

    pub fn noop() -> Self {
        Self { event_tx: None }
    }

    /// Send an event to the session event channel. If it fails, we swallow
    /// the error and log it.
    pub fn send(&self, event: SessionEvent) {
        let Some(tx) = &self.event_tx else { return };
        if let Err(e) = tx.send(event) {
            tracing::error!("failed to send event: {e}");
        }
    }
}
