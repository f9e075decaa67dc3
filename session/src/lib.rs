#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
mod delivery;
mod echo;
mod error;
mod event;
mod gate;
mod orchestrator;
mod phase;
mod pump;
mod store;
mod view;

pub use config::ConfigOverrides;
pub use config::ConfigToml;
pub use config::SessionConfig;
pub use delivery::DeliveryQueue;
pub use delivery::EntryKind;
pub use delivery::TranscriptEntry;
pub use delivery::Utterance;
pub use echo::EchoDeduplicator;
pub use echo::PendingEcho;
pub use error::Result;
pub use error::SessionErr;
pub use event::EventSender;
pub use event::SessionEvent;
pub use gate::CheckpointGate;
pub use gate::Gate;
pub use gate::InterviewPrompt;
pub use gate::IntroKind;
pub use orchestrator::Command;
pub use orchestrator::Orchestrator;
pub use phase::SessionState;
pub use phase::Transition;
pub use phase::TurnPointer;
pub use pump::PumpBlocked;
pub use pump::PumpBudget;
pub use pump::PumpReport;
pub use pump::PumpRun;
pub use pump::PumpStop;
pub use store::Choice;
pub use store::EndedSnapshot;
pub use store::InterviewAnswer;
pub use store::SessionDotJson;
pub use store::SessionStore;
pub use view::AI_COMPOSING_STATUS;
pub use view::SessionView;
