use std::sync::Arc;

use liar_session::EventSender;
use liar_session::Gate;
use liar_session::Orchestrator;
use liar_session::SessionEvent;
use liar_session::SessionStore;
use liar_step_client::GameResult;
use liar_step_client::HttpClient;
use liar_step_client::Phase;
use liar_step_client::Sender;
use liar_step_client::SessionId;
use liar_step_client::WinnerSide;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use tokio::sync::mpsc::unbounded_channel;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::harness::at;
use super::harness::fast_config;

fn ok(body: impl serde::Serialize) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_game_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/game/start"))
        .and(body_partial_json(json!({"sessionId": "e2e", "participantName": "P1"})))
        .respond_with(ok(at(Phase::Description, Some("P1")).build()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/game/step"))
        .and(body_partial_json(
            json!({"action": {"type": "description", "text": "It purrs", "maxAiSteps": 0}}),
        ))
        .respond_with(ok(at(Phase::Voting, None)
            .ai("Bot_1", "It has whiskers.")
            .message(Sender::User, "P1", "It purrs")
            .build()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/game/step"))
        .and(body_partial_json(
            json!({"action": {"type": "vote", "targetName": "Bot_3", "confidence": 4}}),
        ))
        .respond_with(ok(at(Phase::Voting, None).build()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/game/step"))
        .and(body_partial_json(json!({"action": {"type": "noop", "maxAiSteps": 1}})))
        .respond_with(ok(at(Phase::Ended, None)
            .result(GameResult {
                winner_side: Some(WinnerSide::Liar),
                liar: Some("Bot_1".to_string()),
                ..GameResult::default()
            })
            .build()))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    let store = SessionStore::new(home.path());
    let (tx, mut rx) = unbounded_channel();
    let orch = Orchestrator::new(
        Arc::new(HttpClient::new(server.uri()).unwrap()),
        SessionId("e2e".to_string()),
        fast_config(),
        EventSender::new(tx),
        Some(store.clone()),
    );

    orch.start().await.unwrap();
    assert!(orch.acknowledge_intro().await.unwrap());
    assert!(orch.view().input_enabled);
    assert!(orch.send_message("It purrs").await.unwrap());
    assert_eq!(orch.view().gate, Gate::FinalVote);
    assert!(orch.submit_final_vote("Bot_3", 4).await.unwrap());
    orch.wait_delivered().await;

    let view = orch.view();
    assert!(view.ended);
    assert_eq!(view.error, None);
    let lines: Vec<(String, String)> = orch
        .transcript()
        .into_iter()
        .map(|e| (e.name, e.text))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("P1".to_string(), "It purrs".to_string()),
            ("Bot_1".to_string(), "It has whiskers.".to_string()),
        ]
    );

    let mut ended = None;
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::Ended(snapshot) = event {
            ended = Some(*snapshot);
        }
    }
    let ended = ended.expect("ended event");
    assert_eq!(ended.session_id, SessionId("e2e".to_string()));
    assert_eq!(
        ended.response.result.as_ref().and_then(|r| r.liar.as_deref()),
        Some("Bot_1")
    );
    assert_eq!(store.read_last_ended().unwrap(), ended);
}
