//! Decisions for the auto-advance loop that plays AI turns.
//!
//! The loop itself lives on the orchestrator; this module decides whether it
//! may start, whether it may take another iteration and whether a response
//! ends it.

use liar_step_client::Phase;
use liar_step_client::StepOutcome;

use crate::config::SessionConfig;
use crate::gate::Gate;

/// Why the pump did not start or did not continue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpBlocked {
    NotStarted,
    AlreadyPumping,
    GateOpen(Gate),
    MidCheckNeeded,
    Ended,
    HumanTurn,
    /// VOTING and the participant has not voted yet.
    AwaitingVote,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpStop {
    Blocked(PumpBlocked),
    Conflict,
    /// Another call held the in-flight guard.
    StepDeclined,
    BudgetExhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpBudget {
    Normal,
    /// Extended cap used after the vote so play can drain to ENDED.
    AfterVote,
}

impl PumpBudget {
    pub fn max_iterations(self, config: &SessionConfig) -> u32 {
        match self {
            PumpBudget::Normal => config.pump_max_iterations,
            PumpBudget::AfterVote => config.pump_max_iterations_after_vote,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpReport {
    /// Step calls that reached the service.
    pub steps: u32,
    pub stop: PumpStop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpRun {
    Blocked(PumpBlocked),
    Ran(PumpReport),
}

impl PumpRun {
    pub fn steps(&self) -> u32 {
        match self {
            PumpRun::Blocked(_) => 0,
            PumpRun::Ran(report) => report.steps,
        }
    }
}

/// Snapshot of what the pump looks at, taken under the orchestrator lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpInputs {
    pub phase: Option<Phase>,
    pub gate: Gate,
    pub mid_check_needed: bool,
    pub human_turn: bool,
    pub has_voted: bool,
    pub pumping: bool,
}

/// Checks made before every iteration, including the first.
pub fn check_continue(inputs: &PumpInputs) -> Result<(), PumpBlocked> {
    let Some(phase) = inputs.phase else {
        return Err(PumpBlocked::NotStarted);
    };
    if inputs.gate.blocks_pump() {
        return Err(PumpBlocked::GateOpen(inputs.gate));
    }
    if inputs.mid_check_needed {
        return Err(PumpBlocked::MidCheckNeeded);
    }
    if phase == Phase::Ended {
        return Err(PumpBlocked::Ended);
    }
    if inputs.human_turn {
        return Err(PumpBlocked::HumanTurn);
    }
    if phase == Phase::Voting && !inputs.has_voted {
        return Err(PumpBlocked::AwaitingVote);
    }
    Ok(())
}

/// Checks made once when the pump is asked to start.
pub fn check_start(inputs: &PumpInputs) -> Result<(), PumpBlocked> {
    if inputs.pumping {
        return Err(PumpBlocked::AlreadyPumping);
    }
    check_continue(inputs)
}

/// Whether the response to one pump step ends the loop.
pub fn stop_after(outcome: &StepOutcome, has_voted: bool) -> Option<PumpStop> {
    let resp = match outcome {
        StepOutcome::Conflict { .. } => return Some(PumpStop::Conflict),
        StepOutcome::Applied(resp) => resp,
    };
    let blocked = if resp.needs_mid_check() {
        PumpBlocked::MidCheckNeeded
    } else if resp.phase == Phase::Ended {
        PumpBlocked::Ended
    } else if resp.phase == Phase::Voting && !has_voted {
        PumpBlocked::AwaitingVote
    } else if resp.phase.is_speaking() && resp.is_human_turn() {
        PumpBlocked::HumanTurn
    } else {
        return None;
    };
    Some(PumpStop::Blocked(blocked))
}
