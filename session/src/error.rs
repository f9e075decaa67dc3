use liar_step_client::StepError;

pub type Result<T> = std::result::Result<T, SessionErr>;

#[derive(Debug, thiserror::Error)]
pub enum SessionErr {
    #[error(transparent)]
    Step(#[from] StepError),

    /// Reading or writing local session files failed.
    #[error("persist error: {0}")]
    Persist(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
