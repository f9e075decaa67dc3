//! Paced reveal of chat lines.
//!
//! A response can carry several utterances at once. They are buffered here
//! and revealed one at a time with a fixed pause in between, by a single
//! drain task. Appending while a drain runs only extends the buffer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use liar_step_client::ApiMessage;
use liar_step_client::Sender;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::event::EventSender;
use crate::event::SessionEvent;

/// A chat line as received from the service, stamped on arrival.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    pub sender: Sender,
    pub name: String,
    pub text: String,
    pub arrived_at: DateTime<Utc>,
}

impl Utterance {
    pub fn from_api(msg: ApiMessage, arrived_at: DateTime<Utc>) -> Self {
        Self {
            sender: msg.sender,
            name: msg.name,
            text: msg.content,
            arrived_at,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    User,
    Ai,
    /// System lines separate parts of the session instead of reading as chat.
    Divider,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Attribute an utterance for display. The participant's own lines carry
    /// their display name (or "You" before it is known).
    pub fn render(utterance: Utterance, my_name: Option<&str>) -> Self {
        let (kind, name) = match utterance.sender {
            Sender::User => (EntryKind::User, my_name.unwrap_or("You").to_string()),
            Sender::Ai => (EntryKind::Ai, non_empty_or_system(utterance.name)),
            Sender::System => (EntryKind::Divider, non_empty_or_system(utterance.name)),
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            name,
            text: utterance.text,
            timestamp: utterance.arrived_at,
        }
    }

    pub fn local_user(name: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::User,
            name: name.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }
}

fn non_empty_or_system(name: String) -> String {
    if name.is_empty() {
        "System".to_string()
    } else {
        name
    }
}

#[derive(Default)]
struct QueueState {
    buffer: VecDeque<TranscriptEntry>,
    draining: bool,
    transcript: Vec<TranscriptEntry>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    pacing: Duration,
    idle: Notify,
    events: EventSender,
}

#[derive(Clone)]
pub struct DeliveryQueue {
    inner: Arc<QueueInner>,
}

impl DeliveryQueue {
    pub fn new(pacing: Duration, events: EventSender) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                pacing,
                idle: Notify::new(),
                events,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append entries in order and make sure a drain is running. Must be
    /// called from within a tokio runtime.
    pub fn enqueue(&self, entries: Vec<TranscriptEntry>) {
        if entries.is_empty() {
            return;
        }
        let start_drain = {
            let mut st = self.state();
            st.buffer.extend(entries);
            if st.draining {
                false
            } else {
                st.draining = true;
                true
            }
        };
        if start_drain {
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }
    }

    async fn drain(self) {
        loop {
            let next = {
                let mut st = self.state();
                match st.buffer.pop_front() {
                    Some(entry) => {
                        st.transcript.push(entry.clone());
                        Some(entry)
                    }
                    None => {
                        st.draining = false;
                        None
                    }
                }
            };
            let Some(entry) = next else {
                self.inner.idle.notify_waiters();
                return;
            };
            self.inner.events.send(SessionEvent::MessageRevealed(entry));
            tokio::time::sleep(self.inner.pacing).await;
        }
    }

    /// Show an entry immediately. Used for the participant's own message,
    /// which is already known locally. Entries still waiting in the buffer
    /// arrived earlier, so they are revealed first, without pacing.
    pub fn render_now(&self, entry: TranscriptEntry) {
        let revealed: Vec<TranscriptEntry> = {
            let mut st = self.state();
            let mut revealed: Vec<TranscriptEntry> = st.buffer.drain(..).collect();
            revealed.push(entry);
            st.transcript.extend(revealed.iter().cloned());
            revealed
        };
        for entry in revealed {
            self.inner.events.send(SessionEvent::MessageRevealed(entry));
        }
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.state().transcript.clone()
    }

    pub fn pending(&self) -> usize {
        self.state().buffer.len()
    }

    pub fn is_idle(&self) -> bool {
        let st = self.state();
        !st.draining && st.buffer.is_empty()
    }

    /// Resolve once every buffered entry has been revealed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}
