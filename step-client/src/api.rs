use crate::types::ServerResponse;
use crate::types::SessionId;
use crate::types::StartRequest;
use crate::types::StepAction;

pub type Result<T> = std::result::Result<T, StepError>;

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("http error: {0}")]
    Http(String),
    /// Non-success status other than the turn-conflict signal.
    #[error("{endpoint} failed: {status}; body={body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Msg(String),
}

/// Result of a single step call that reached the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Applied(Box<ServerResponse>),
    /// The service rejected the action because it was not the caller's turn
    /// or the session was busy. Callers stop advancing but report nothing.
    Conflict { body: String },
}

#[async_trait::async_trait]
pub trait StepBackend: Send + Sync {
    async fn start(&self, req: &StartRequest) -> Result<ServerResponse>;
    /// Advance the session by zero or one actions. Exactly one call may be
    /// outstanding per session; enforcing that is the caller's job.
    async fn step(&self, session_id: &SessionId, action: &StepAction) -> Result<StepOutcome>;
}
