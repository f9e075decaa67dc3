//! Human checkpoints that must interrupt automatic play.
//!
//! At most one checkpoint is open at a time. Opening another one replaces
//! it; closing is checked against the kind the caller expects, so a close
//! handler that fires twice only closes (and resumes) once.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntroKind {
    Explanation,
    Discussion,
}

impl IntroKind {
    pub fn title(self) -> &'static str {
        match self {
            IntroKind::Explanation => "Explanation session",
            IntroKind::Discussion => "Discussion session",
        }
    }
}

/// Which follow-up question the post-vote interview asks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum InterviewPrompt {
    /// Final vote named the mid-check suspect.
    SameChoice,
    ChangedChoice,
    /// One of the two choices is missing.
    Unknown,
}

impl InterviewPrompt {
    pub fn for_choices(mid_check_suspect: Option<&str>, final_vote_target: Option<&str>) -> Self {
        match (mid_check_suspect, final_vote_target) {
            (Some(a), Some(b)) if a == b => InterviewPrompt::SameChoice,
            (Some(_), Some(_)) => InterviewPrompt::ChangedChoice,
            _ => InterviewPrompt::Unknown,
        }
    }

    pub fn same_choice(self) -> Option<bool> {
        match self {
            InterviewPrompt::SameChoice => Some(true),
            InterviewPrompt::ChangedChoice => Some(false),
            InterviewPrompt::Unknown => None,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            InterviewPrompt::SameChoice => {
                "You chose the same suspect as mid-check. Why did you keep the same choice?"
            }
            InterviewPrompt::ChangedChoice => {
                "You chose a different suspect from mid-check. Why did you change your choice?"
            }
            InterviewPrompt::Unknown => "Tell us why you chose your final suspect.",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", content = "detail", rename_all = "kebab-case")]
pub enum Gate {
    #[default]
    Closed,
    PhaseInfo(IntroKind),
    MidCheck,
    FinalVote,
    PostVoteInterview(InterviewPrompt),
    /// Shown while the AI players cast their votes. It is an indicator, not
    /// a question, so automatic play continues underneath it.
    AiTally,
}

impl Gate {
    pub fn is_open(self) -> bool {
        self != Gate::Closed
    }

    /// True when automatic play has to wait for the participant.
    pub fn blocks_pump(self) -> bool {
        !matches!(self, Gate::Closed | Gate::AiTally)
    }
}

#[derive(Debug, Default)]
pub struct CheckpointGate {
    current: Gate,
    explanation_intro_shown: bool,
    discussion_intro_shown: bool,
}

impl CheckpointGate {
    pub fn current(&self) -> Gate {
        self.current
    }

    /// Open `gate`, returning whatever it replaced.
    pub fn open(&mut self, gate: Gate) -> Option<Gate> {
        let prev = std::mem::replace(&mut self.current, gate);
        if prev.is_open() && prev != gate {
            tracing::debug!(?prev, next = ?gate, "checkpoint replaced");
        }
        prev.is_open().then_some(prev)
    }

    /// Open the intro for `kind` unless it was already shown this session.
    pub fn try_open_intro(&mut self, kind: IntroKind) -> bool {
        let shown = match kind {
            IntroKind::Explanation => &mut self.explanation_intro_shown,
            IntroKind::Discussion => &mut self.discussion_intro_shown,
        };
        if *shown {
            return false;
        }
        *shown = true;
        self.open(Gate::PhaseInfo(kind));
        true
    }

    /// Close the current gate if `pred` accepts it.
    fn close_if(&mut self, pred: impl FnOnce(Gate) -> bool) -> Option<Gate> {
        if self.current.is_open() && pred(self.current) {
            Some(std::mem::take(&mut self.current))
        } else {
            None
        }
    }

    pub fn close_intro(&mut self) -> Option<Gate> {
        self.close_if(|g| matches!(g, Gate::PhaseInfo(_)))
    }

    pub fn close_mid_check(&mut self) -> Option<Gate> {
        self.close_if(|g| g == Gate::MidCheck)
    }

    pub fn close_final_vote(&mut self) -> Option<Gate> {
        self.close_if(|g| g == Gate::FinalVote)
    }

    pub fn close_interview(&mut self) -> Option<Gate> {
        self.close_if(|g| matches!(g, Gate::PostVoteInterview(_)))
    }

    pub fn close_ai_tally(&mut self) -> Option<Gate> {
        self.close_if(|g| g == Gate::AiTally)
    }
}
