//! Reconciliation of the participant's optimistically rendered message with
//! the copy the service sends back.

use liar_step_client::ApiMessage;
use liar_step_client::Sender;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEcho {
    pub display_name: String,
    pub trimmed_content: String,
}

impl PendingEcho {
    fn matches(&self, msg: &ApiMessage) -> bool {
        msg.sender == Sender::User
            && (msg.name.is_empty() || msg.name == self.display_name)
            && msg.content.trim() == self.trimmed_content
    }
}

#[derive(Debug, Default)]
pub struct EchoDeduplicator {
    pending: Option<PendingEcho>,
}

impl EchoDeduplicator {
    /// Remember a just-sent message. Replaces any earlier pending echo.
    pub fn record(&mut self, display_name: impl Into<String>, content: &str) {
        self.pending = Some(PendingEcho {
            display_name: display_name.into(),
            trimmed_content: content.trim().to_string(),
        });
    }

    pub fn pending(&self) -> Option<&PendingEcho> {
        self.pending.as_ref()
    }

    /// Drop the first server copy of the pending echo from `messages`.
    ///
    /// The first batch that carries any messages is the only attempt: the
    /// pending echo is consumed whether or not it matched. Empty batches leave
    /// it in place.
    pub fn reconcile(&mut self, mut messages: Vec<ApiMessage>) -> Vec<ApiMessage> {
        if messages.is_empty() {
            return messages;
        }
        let Some(pending) = self.pending.take() else {
            return messages;
        };
        match messages.iter().position(|m| pending.matches(m)) {
            Some(idx) => {
                messages.remove(idx);
            }
            None => {
                tracing::debug!(
                    name = %pending.display_name,
                    "no server echo for sent message; keeping local copy only"
                );
            }
        }
        messages
    }
}
