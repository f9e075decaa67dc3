use liar_session::EndedSnapshot;
use liar_session::EntryKind;
use liar_session::Gate;
use liar_session::IntroKind;
use liar_session::SessionView;
use liar_session::TranscriptEntry;
use liar_step_client::Role;
use liar_step_client::WinnerSide;

pub(crate) fn entry_line(entry: &TranscriptEntry) -> String {
    match entry.kind {
        EntryKind::Divider => format!("--- {} ---", entry.text),
        EntryKind::User | EntryKind::Ai => format!("{}: {}", entry.name, entry.text),
    }
}

pub(crate) fn header(view: &SessionView) -> String {
    let phase = view.phase_label.unwrap_or("waiting");
    let round = view.round.unwrap_or(1);
    let topic = view.topic.as_deref().unwrap_or("?");
    let role = match view.role {
        Some(Role::Liar) => "liar",
        Some(Role::Citizen) => "citizen",
        None => "?",
    };
    let keyword = view.keyword.as_deref().unwrap_or("?");
    format!("[{phase} · round {round}] topic: {topic} · you are the {role} · keyword: {keyword}")
}

/// Instructions for the dialog that just opened.
pub(crate) fn gate_prompt(gate: Gate, view: &SessionView) -> Option<String> {
    let candidates = view.candidates.join(", ");
    match gate {
        Gate::Closed => None,
        Gate::PhaseInfo(kind) => Some(format!(
            "== {} ==\n{}\n(press Enter to continue)",
            kind.title(),
            intro_text(kind)
        )),
        Gate::MidCheck => Some(format!(
            "Mid-game check: who do you suspect right now? [{candidates}]\n(answer `<player> <confidence 1-5>`)"
        )),
        Gate::FinalVote => Some(format!(
            "Final vote: who is the liar? [{candidates}]\n(answer `<player> <confidence 1-5>`)"
        )),
        Gate::PostVoteInterview(prompt) => Some(prompt.text().to_string()),
        Gate::AiTally => Some("The AI players are casting their votes…".to_string()),
    }
}

fn intro_text(kind: IntroKind) -> &'static str {
    match kind {
        IntroKind::Explanation => {
            "Take turns describing the keyword in one sentence without saying it. \
             The liar does not know the keyword and must blend in."
        }
        IntroKind::Discussion => {
            "Discuss who might be the liar. When the discussion ends everyone votes."
        }
    }
}

pub(crate) fn results(snapshot: &EndedSnapshot) -> String {
    let mut out = vec!["== Game over ==".to_string()];
    if let Some(result) = &snapshot.response.result {
        let winner = match result.winner_side {
            Some(WinnerSide::Citizens) => "the citizens",
            Some(WinnerSide::Liar) => "the liar",
            None => "nobody",
        };
        out.push(format!("Winner: {winner}"));
        if let Some(liar) = &result.liar {
            out.push(format!("The liar was {liar}."));
        }
        if let Some(keyword) = &result.keyword {
            out.push(format!("The keyword was {keyword}."));
        }
        let mut votes: Vec<_> = result.votes.iter().collect();
        votes.sort();
        for (voter, target) in votes {
            out.push(format!("  {voter} → {target}"));
        }
    }
    if let Some(vote) = &snapshot.vote {
        out.push(format!(
            "Your vote: {} (confidence {})",
            vote.target, vote.confidence
        ));
    }
    out.join("\n")
}

pub(crate) const HELP: &str = "\
Type a line to speak on your turn.
Dialogs take `<player> <confidence 1-5>` or a short answer.
/pump   let the AI players continue
/retry  clear an error and re-enable input
/quit   leave the game";
