use liar_step_client::Phase;
use liar_step_client::Role;
use serde::Serialize;

use crate::gate::Gate;

pub const AI_COMPOSING_STATUS: &str = "AI is composing… Please pause input.";

/// What a front-end needs to draw the play screen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub phase: Option<Phase>,
    pub phase_label: Option<&'static str>,
    pub round: Option<u32>,
    pub topic: Option<String>,
    /// Hidden once the game has ended.
    pub current_player: Option<String>,
    pub my_name: Option<String>,
    pub role: Option<Role>,
    pub keyword: Option<String>,
    pub gate: Gate,
    /// AI players offered by the mid-check and final-vote dialogs.
    pub candidates: Vec<String>,
    pub is_my_turn: bool,
    pub input_enabled: bool,
    pub busy: bool,
    pub status_text: Option<&'static str>,
    pub loading: bool,
    pub error: Option<String>,
    pub has_voted: bool,
    pub ended: bool,
}
