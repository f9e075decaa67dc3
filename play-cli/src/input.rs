//! Turning typed lines into orchestrator commands, based on which dialog is
//! open.

use liar_session::Command;
use liar_session::Gate;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Input {
    Run(Command),
    Help,
    Quit,
    /// Nothing to do; the string says why.
    Ignored(&'static str),
}

pub(crate) fn parse_line(gate: Gate, line: &str) -> Input {
    let line = line.trim();
    match line {
        "/quit" | "/exit" => return Input::Quit,
        "/help" => return Input::Help,
        "/retry" => return Input::Run(Command::ClearError),
        "/pump" => return Input::Run(Command::Pump),
        _ => {}
    }

    match gate {
        Gate::Closed => {
            if line.is_empty() {
                Input::Ignored("type a message, or /help")
            } else {
                Input::Run(Command::SendMessage(line.to_string()))
            }
        }
        Gate::PhaseInfo(_) => Input::Run(Command::AcknowledgeIntro),
        Gate::MidCheck => match parse_choice(line) {
            Some((suspect, confidence)) => Input::Run(Command::SubmitMidCheck {
                suspect,
                confidence,
            }),
            None => Input::Ignored("expected `<player> <confidence 1-5>`"),
        },
        Gate::FinalVote => match parse_choice(line) {
            Some((target, confidence)) => Input::Run(Command::SubmitFinalVote { target, confidence }),
            None => Input::Ignored("expected `<player> <confidence 1-5>`"),
        },
        Gate::PostVoteInterview(_) => {
            if line.is_empty() {
                Input::Ignored("please write a short answer")
            } else {
                Input::Run(Command::SubmitInterview(line.to_string()))
            }
        }
        Gate::AiTally => Input::Ignored("the AI players are still voting"),
    }
}

/// `Bot_2 4` → (`Bot_2`, 4). Range checks happen in the orchestrator.
fn parse_choice(line: &str) -> Option<(String, u8)> {
    let (name, confidence) = line.rsplit_once(char::is_whitespace)?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let confidence = confidence.parse().ok()?;
    Some((name.to_string(), confidence))
}
