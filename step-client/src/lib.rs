#![deny(clippy::unwrap_used, clippy::expect_used)]

mod api;
mod types;

pub use api::Result;
pub use api::StepBackend;
pub use api::StepError;
pub use api::StepOutcome;
pub use types::ApiMessage;
pub use types::GameResult;
pub use types::MID_CHECK_NEED;
pub use types::Phase;
pub use types::PlayerInfo;
pub use types::PrivateState;
pub use types::PublicState;
pub use types::Role;
pub use types::Sender;
pub use types::ServerResponse;
pub use types::SessionId;
pub use types::StartRequest;
pub use types::StepAction;
pub use types::StepRequest;
pub use types::TurnInfo;
pub use types::UiSignal;
pub use types::WinnerSide;

#[cfg(feature = "online")]
mod http;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "online")]
pub use http::HttpClient;
#[cfg(feature = "online")]
pub use http::PathStyle;

#[cfg(feature = "mock")]
pub use mock::RecordedCall;
#[cfg(feature = "mock")]
pub use mock::ResponseFixture;
#[cfg(feature = "mock")]
pub use mock::Scripted;
#[cfg(feature = "mock")]
pub use mock::ScriptedBackend;
