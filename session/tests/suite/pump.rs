use assert_matches::assert_matches;
use liar_session::Command;
use liar_session::Gate;
use liar_session::IntroKind;
use liar_session::PumpBlocked;
use liar_session::PumpReport;
use liar_session::PumpRun;
use liar_session::PumpStop;
use liar_session::SessionConfig;
use liar_session::SessionEvent;
use liar_step_client::Phase;
use liar_step_client::StepAction;
use pretty_assertions::assert_eq;

use super::harness::Harness;
use super::harness::at;

#[tokio::test(start_paused = true)]
async fn pump_halts_on_mid_check_until_dialog_closes() {
    let h = Harness::new(at(Phase::Description, Some("Bot_1")).build());
    h.start().await;
    assert!(h.steps().is_empty(), "start must not pump behind the intro");

    h.backend
        .respond(
            at(Phase::Description, Some("Bot_2"))
                .ai("Bot_1", "It is small.")
                .build(),
        )
        .respond(
            at(Phase::Description, Some("P1"))
                .ai("Bot_2", "It purrs.")
                .need_mid_check()
                .build(),
        );
    assert!(h.orch.acknowledge_intro().await.unwrap());
    assert_eq!(h.steps(), vec![StepAction::single_ai_turn(); 2]);
    assert_eq!(h.orch.view().gate, Gate::MidCheck);

    // Every trigger is inert while the mid-check is open.
    assert_eq!(
        h.orch.pump().await.unwrap(),
        PumpRun::Blocked(PumpBlocked::GateOpen(Gate::MidCheck))
    );
    assert!(!h.orch.send_message("hello?").await.unwrap());
    assert!(!h.orch.acknowledge_intro().await.unwrap());
    assert_eq!(h.steps().len(), 2);

    h.backend
        .respond(at(Phase::Discussion, Some("Bot_3")).build())
        .respond(
            at(Phase::Discussion, Some("P1"))
                .ai("Bot_3", "Bot_1 was vague.")
                .build(),
        );
    assert!(h.orch.submit_mid_check("Bot_1", 3).await.unwrap());
    assert_eq!(
        h.orch.view().gate,
        Gate::PhaseInfo(IntroKind::Discussion)
    );
    assert_eq!(
        h.steps().last(),
        Some(&StepAction::MidCheck {
            suspect_name: "Bot_1".to_string(),
            confidence: 3,
        })
    );
    assert_eq!(h.steps().len(), 3, "discussion intro holds the pump");

    assert!(h.orch.acknowledge_intro().await.unwrap());
    assert_eq!(h.steps().len(), 4);
    assert_eq!(h.steps().last(), Some(&StepAction::single_ai_turn()));
    assert!(h.orch.view().is_my_turn);
    assert_eq!(h.backend.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_mid_check_is_rejected_locally() {
    let h = Harness::new(at(Phase::Description, Some("Bot_1")).build());
    h.start().await;
    h.backend
        .respond(at(Phase::Description, Some("P1")).need_mid_check().build());
    h.orch.acknowledge_intro().await.unwrap();
    assert_eq!(h.orch.view().gate, Gate::MidCheck);

    assert!(!h.orch.submit_mid_check("P1", 3).await.unwrap());
    assert!(!h.orch.submit_mid_check("Bot_9", 3).await.unwrap());
    assert!(!h.orch.submit_mid_check("Bot_1", 0).await.unwrap());
    assert!(!h.orch.submit_mid_check("Bot_1", 6).await.unwrap());
    assert_eq!(h.orch.view().gate, Gate::MidCheck);
    assert_eq!(h.steps().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn iteration_cap_bounds_the_loop() {
    let config = SessionConfig {
        pump_max_iterations: 3,
        ..SessionConfig::default()
    };
    let h = Harness::with_config(at(Phase::Description, Some("Bot_1")).build(), config);
    h.start().await;
    for _ in 0..6 {
        h.backend
            .respond(at(Phase::Description, Some("Bot_2")).build());
    }
    h.orch.acknowledge_intro().await.unwrap();
    assert_eq!(h.steps().len(), 3);
    assert_eq!(h.orch.view().error, None);

    assert_eq!(
        h.orch.pump().await.unwrap(),
        PumpRun::Ran(PumpReport {
            steps: 3,
            stop: PumpStop::BudgetExhausted,
        })
    );
    assert_eq!(h.backend.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn conflict_stops_the_loop_without_an_error() {
    let h = Harness::new(at(Phase::Description, Some("Bot_1")).build());
    h.start().await;
    h.backend.conflict();
    h.orch.acknowledge_intro().await.unwrap();
    assert_eq!(h.steps().len(), 1);

    h.backend
        .respond(at(Phase::Description, Some("Bot_2")).build())
        .conflict();
    assert_eq!(
        h.orch.pump().await.unwrap(),
        PumpRun::Ran(PumpReport {
            steps: 2,
            stop: PumpStop::Conflict,
        })
    );
    let view = h.orch.view();
    assert_eq!(view.error, None);
    assert!(!view.busy);
}

#[tokio::test(start_paused = true)]
async fn step_failure_is_fatal_and_releases_guards() {
    let mut h = Harness::new(at(Phase::Description, Some("Bot_1")).build());
    h.start().await;
    h.backend.fail("upstream exploded");
    h.orch.dispatch(Command::AcknowledgeIntro).await.unwrap();

    let view = h.orch.view();
    assert_eq!(view.error.as_deref(), Some("upstream exploded"));
    assert!(!view.busy);
    assert!(!view.input_enabled);
    let events = h.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Fatal(msg) if msg == "upstream exploded"))
    );
    assert_matches!(
        events
            .iter()
            .rev()
            .find(|e| matches!(e, SessionEvent::BusyChanged(_))),
        Some(SessionEvent::BusyChanged(false))
    );

    // Clearing the error does not replay the failed step.
    h.orch.clear_error();
    assert_eq!(h.orch.view().error, None);
    assert_eq!(h.steps().len(), 1);

    // Both guards were released by the aborted loop.
    h.backend
        .respond(at(Phase::Description, Some("P1")).build());
    assert_eq!(h.orch.pump().await.unwrap().steps(), 1);
}
