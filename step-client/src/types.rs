//! Wire types exchanged with the game service.
//!
//! Every response replaces the client's view of the session wholesale, so
//! the types here mirror the JSON shapes exactly and carry no client-side
//! derived state.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The `ui.need` value asking the client to run the mid-game suspect check.
pub const MID_CHECK_NEED: &str = "mid-check";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse stage of the game, authoritative on the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Description,
    Discussion,
    Voting,
    Ended,
}

impl Phase {
    /// Phases in which players take speaking turns.
    pub fn is_speaking(self) -> bool {
        matches!(self, Phase::Description | Phase::Discussion)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Description => "explanation",
            Phase::Discussion => "discussion",
            Phase::Voting => "voting",
            Phase::Ended => "ended",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Citizen,
    Liar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    System,
}

/// A single chat line as the service reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub sender: Sender,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    #[serde(default)]
    pub is_ai: bool,
}

// Nullable fields below use `deserialize_with = "Option::deserialize"` so
// the key itself stays mandatory: a missing key is protocol drift, `null` is
// a legitimate value.

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInfo {
    pub order: Vec<String>,
    pub index: usize,
    /// `null` when the turn order is empty.
    #[serde(deserialize_with = "Option::deserialize")]
    pub current_player: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicState {
    pub round: u32,
    #[serde(deserialize_with = "Option::deserialize")]
    pub topic: Option<String>,
    pub players: Vec<PlayerInfo>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub turn: Option<TurnInfo>,
}

impl PublicState {
    pub fn current_player(&self) -> Option<&str> {
        self.turn.as_ref()?.current_player.as_deref()
    }

    pub fn ai_players(&self) -> impl Iterator<Item = &PlayerInfo> {
        self.players.iter().filter(|p| p.is_ai)
    }
}

/// What only the local participant is allowed to see.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateState {
    #[serde(deserialize_with = "Option::deserialize")]
    pub my_name: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub role: Option<Role>,
    /// `"???"` when the participant is the liar.
    #[serde(deserialize_with = "Option::deserialize")]
    pub keyword: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinnerSide {
    Citizens,
    Liar,
}

/// Outcome attached to the response that moves the game into ENDED.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    #[serde(default)]
    pub winner_side: Option<WinnerSide>,
    #[serde(default)]
    pub liar: Option<String>,
    #[serde(default)]
    pub suspect: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub votes: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResponse {
    pub phase: Phase,
    pub public_state: PublicState,
    pub private_state: PrivateState,
    #[serde(default)]
    pub ui: UiSignal,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
}

impl ServerResponse {
    pub fn needs_mid_check(&self) -> bool {
        self.ui.need.as_deref() == Some(MID_CHECK_NEED)
    }

    /// True when the response hands the turn to the local participant.
    pub fn is_human_turn(&self) -> bool {
        match (
            self.private_state.my_name.as_deref(),
            self.public_state.current_player(),
        ) {
            (Some(me), Some(current)) => me == current,
            _ => false,
        }
    }
}

/// Advance the session by zero or one actions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StepAction {
    Noop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_ai_steps: Option<u32>,
    },
    Description {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_ai_steps: Option<u32>,
    },
    Discussion {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_ai_steps: Option<u32>,
    },
    MidCheck {
        suspect_name: String,
        confidence: u8,
    },
    Vote {
        target_name: String,
        confidence: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_ai_steps: Option<u32>,
    },
}

impl StepAction {
    /// The pump's action: generate at most one AI turn.
    pub fn single_ai_turn() -> Self {
        StepAction::Noop {
            max_ai_steps: Some(1),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::Noop { .. } => "noop",
            StepAction::Description { .. } => "description",
            StepAction::Discussion { .. } => "discussion",
            StepAction::MidCheck { .. } => "mid_check",
            StepAction::Vote { .. } => "vote",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub session_id: SessionId,
    pub participant_name: String,
    pub ai_count: u32,
    pub use_fool: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest<'a> {
    pub session_id: &'a SessionId,
    pub action: &'a StepAction,
}
