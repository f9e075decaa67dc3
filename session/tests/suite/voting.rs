use assert_matches::assert_matches;
use liar_session::EndedSnapshot;
use liar_session::Gate;
use liar_session::InterviewPrompt;
use liar_session::IntroKind;
use liar_session::PumpBlocked;
use liar_session::PumpRun;
use liar_session::SessionConfig;
use liar_session::SessionEvent;
use liar_session::SessionStore;
use liar_step_client::GameResult;
use liar_step_client::Phase;
use liar_step_client::ScriptedBackend;
use liar_step_client::ServerResponse;
use liar_step_client::StepAction;
use liar_step_client::WinnerSide;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use super::harness::Harness;
use super::harness::at;
use super::harness::fast_config;

fn ended() -> ServerResponse {
    at(Phase::Ended, None)
        .result(GameResult {
            winner_side: Some(WinnerSide::Citizens),
            liar: Some("Bot_2".to_string()),
            suspect: Some("Bot_2".to_string()),
            keyword: Some("cat".to_string()),
            topic: Some("Animals".to_string()),
            ..GameResult::default()
        })
        .build()
}

fn ended_event(events: Vec<SessionEvent>) -> Option<EndedSnapshot> {
    events.into_iter().find_map(|e| match e {
        SessionEvent::Ended(snapshot) => Some(*snapshot),
        _ => None,
    })
}

#[tokio::test(start_paused = true)]
async fn vote_gates_the_pump_then_ai_votes_drain_to_ended() {
    let config = SessionConfig {
        pump_max_iterations: 2,
        ..fast_config()
    };
    let mut h = Harness::with_config(at(Phase::Discussion, Some("Bot_1")).build(), config);
    h.start().await;
    h.backend.respond(at(Phase::Voting, None).build());
    h.orch.acknowledge_intro().await.unwrap();
    assert_eq!(h.orch.view().gate, Gate::FinalVote);
    assert_eq!(
        h.orch.pump().await.unwrap(),
        PumpRun::Blocked(PumpBlocked::GateOpen(Gate::FinalVote))
    );

    // Not an AI player.
    assert!(!h.orch.submit_final_vote("P1", 3).await.unwrap());

    h.backend.respond(at(Phase::Voting, None).build());
    for _ in 0..3 {
        h.backend.respond(at(Phase::Voting, None).build());
    }
    h.backend.respond(ended());
    assert!(h.orch.submit_final_vote("Bot_2", 5).await.unwrap());

    let steps = h.steps();
    assert_eq!(steps.len(), 6);
    assert_eq!(
        steps[1],
        StepAction::Vote {
            target_name: "Bot_2".to_string(),
            confidence: 5,
            max_ai_steps: Some(0),
        }
    );
    assert!(steps[2..].iter().all(|a| *a == StepAction::single_ai_turn()));

    let view = h.orch.view();
    assert!(view.ended);
    assert!(view.has_voted);
    assert_eq!(view.gate, Gate::Closed);
    assert_eq!(view.current_player, None);

    let snapshot = ended_event(h.drain_events()).expect("ended event");
    assert_eq!(snapshot.vote.map(|v| (v.target, v.confidence)), Some(("Bot_2".to_string(), 5)));
    assert_eq!(
        snapshot.response.result.and_then(|r| r.winner_side),
        Some(WinnerSide::Citizens)
    );

    // ENDED absorbs every later trigger.
    assert_eq!(
        h.orch.pump().await.unwrap(),
        PumpRun::Blocked(PumpBlocked::Ended)
    );
    assert!(!h.orch.send_message("one more thing").await.unwrap());
    assert_eq!(h.steps().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn interview_runs_before_the_tally() {
    let config = SessionConfig {
        post_vote_interview: true,
        ..fast_config()
    };
    let mut h = Harness::with_config(at(Phase::Voting, None).build(), config);
    h.start().await;
    h.orch.acknowledge_intro().await.unwrap();

    h.backend
        .respond(at(Phase::Voting, None).build())
        .respond(ended());
    assert!(h.orch.submit_final_vote("Bot_1", 3).await.unwrap());
    assert_eq!(
        h.orch.view().gate,
        Gate::PostVoteInterview(InterviewPrompt::Unknown)
    );
    assert_eq!(h.steps().len(), 1, "no AI votes while the interview is open");

    assert!(!h.orch.submit_interview("   ").await.unwrap());
    assert!(h.orch.submit_interview(" gut feeling ").await.unwrap());

    let snapshot = ended_event(h.drain_events()).expect("ended event");
    let interview = snapshot.interview.expect("interview answer");
    assert_eq!(interview.reason, "gut feeling");
    assert_eq!(interview.same_choice, None);
    assert_eq!(h.orch.view().gate, Gate::Closed);
    assert_eq!(h.steps().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn end_during_interview_waits_for_the_answer_and_persists() {
    let home = tempdir().unwrap();
    let store = SessionStore::new(home.path());
    let config = SessionConfig {
        post_vote_interview: true,
        ..fast_config()
    };
    let backend = ScriptedBackend::new(at(Phase::Discussion, Some("P1")).need_mid_check().build());
    let mut h = Harness::with_backend(backend, config, Some(store.clone()));
    h.start().await;
    h.orch.acknowledge_intro().await.unwrap();
    assert_eq!(h.orch.view().gate, Gate::MidCheck);

    h.backend.respond(at(Phase::Voting, None).build());
    assert!(h.orch.submit_mid_check("Bot_3", 2).await.unwrap());
    assert_eq!(
        h.orch.view().gate,
        Gate::PhaseInfo(IntroKind::Discussion)
    );
    assert!(h.orch.acknowledge_intro().await.unwrap());
    assert_eq!(h.orch.view().gate, Gate::FinalVote);

    h.backend.respond(ended());
    assert!(h.orch.submit_final_vote("Bot_3", 4).await.unwrap());
    assert_eq!(
        h.orch.view().gate,
        Gate::PostVoteInterview(InterviewPrompt::SameChoice)
    );
    assert!(h.orch.view().ended);
    assert_eq!(ended_event(h.drain_events()), None);
    assert!(store.read_last_ended().is_err());

    assert!(h.orch.submit_interview("They dodged every question").await.unwrap());
    let snapshot = ended_event(h.drain_events()).expect("ended event");
    assert_matches!(
        snapshot.interview.as_ref().map(|i| i.same_choice),
        Some(Some(true))
    );
    assert_eq!(
        snapshot.mid_check.as_ref().map(|c| c.target.as_str()),
        Some("Bot_3")
    );
    assert_eq!(store.read_last_ended().unwrap(), snapshot);
    assert_eq!(h.steps().len(), 2);
}
