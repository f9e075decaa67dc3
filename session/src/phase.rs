//! The session as last reported by the service.
//!
//! The snapshot is swapped wholesale on every response; nothing here patches
//! individual fields or advances the phase locally.

use liar_step_client::Phase;
use liar_step_client::ServerResponse;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnPointer {
    pub my_name: Option<String>,
    pub current_player: Option<String>,
}

impl TurnPointer {
    pub fn is_mine(&self) -> bool {
        matches!((&self.my_name, &self.current_player), (Some(me), Some(cur)) if me == cur)
    }

    pub fn is_someone_elses(&self) -> bool {
        matches!((&self.my_name, &self.current_player), (Some(me), Some(cur)) if me != cur)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: Option<Phase>,
    pub to: Phase,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != Some(self.to)
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    snapshot: Option<ServerResponse>,
}

impl SessionState {
    /// Replace the snapshot with `resp`. Callers drop responses once ENDED
    /// has been observed.
    pub fn apply(&mut self, resp: ServerResponse) -> Transition {
        let transition = Transition {
            from: self.phase(),
            to: resp.phase,
        };
        self.snapshot = Some(resp);
        transition
    }

    pub fn snapshot(&self) -> Option<&ServerResponse> {
        self.snapshot.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.snapshot.as_ref().map(|s| s.phase)
    }

    pub fn is_ended(&self) -> bool {
        self.phase() == Some(Phase::Ended)
    }

    pub fn needs_mid_check(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(ServerResponse::needs_mid_check)
    }

    pub fn turn(&self) -> TurnPointer {
        let Some(snap) = &self.snapshot else {
            return TurnPointer::default();
        };
        TurnPointer {
            my_name: snap.private_state.my_name.clone(),
            current_player: snap.public_state.current_player().map(str::to_string),
        }
    }

    fn in_speaking_phase(&self) -> bool {
        self.phase().is_some_and(Phase::is_speaking)
    }

    /// The turn pointer names the participant during a speaking phase.
    /// Ignores checkpoints; see [`SessionState::is_my_turn`].
    pub fn is_human_turn(&self) -> bool {
        self.in_speaking_phase() && self.turn().is_mine()
    }

    /// The participant may type: their turn, nothing open, no mid-check due.
    pub fn is_my_turn(&self, gate_blocks: bool) -> bool {
        self.is_human_turn() && !gate_blocks && !self.needs_mid_check()
    }

    /// An AI player holds the turn and nothing is waiting on the participant.
    pub fn is_ai_turn(&self, gate_blocks: bool) -> bool {
        self.in_speaking_phase()
            && self.turn().is_someone_elses()
            && !gate_blocks
            && !self.needs_mid_check()
    }

    /// Names of the AI players, offered as suspects and vote targets.
    pub fn candidates(&self) -> Vec<String> {
        self.snapshot
            .as_ref()
            .map(|s| s.public_state.ai_players().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    }
}
