use assert_matches::assert_matches;
use liar_step_client::HttpClient;
use liar_step_client::Phase;
use liar_step_client::PathStyle;
use liar_step_client::SessionId;
use liar_step_client::StartRequest;
use liar_step_client::StepAction;
use liar_step_client::StepBackend;
use liar_step_client::StepError;
use liar_step_client::StepOutcome;
use liar_step_client::WinnerSide;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn response_body(phase: &str, current: &str) -> Value {
    json!({
        "ok": true,
        "sessionId": "sess-1",
        "phase": phase,
        "publicState": {
            "round": 1,
            "topic": "Fruit",
            "players": [
                {"name": "P1", "is_ai": false},
                {"name": "Bot_1", "is_ai": true},
                {"name": "Bot_2", "is_ai": true}
            ],
            "turn": {"order": ["Bot_1", "P1", "Bot_2"], "index": 0, "currentPlayer": current}
        },
        "privateState": {"myName": "P1", "role": "CITIZEN", "keyword": "apple"},
        "messages": [{"sender": "ai", "name": "Bot_1", "content": "It grows on trees."}]
    })
}

fn sid() -> SessionId {
    SessionId("sess-1".to_string())
}

#[tokio::test]
async fn step_posts_session_and_tagged_action() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/game/step"))
        .and(body_json(json!({
            "sessionId": "sess-1",
            "action": {"type": "description", "text": "It is red", "maxAiSteps": 0}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body("DESCRIPTION", "Bot_2")))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(server.uri()).unwrap();
    let action = StepAction::Description {
        text: "It is red".to_string(),
        max_ai_steps: Some(0),
    };
    let outcome = client.step(&sid(), &action).await.unwrap();
    let StepOutcome::Applied(resp) = outcome else {
        panic!("expected applied response, got {outcome:?}");
    };
    assert_eq!(resp.phase, Phase::Description);
    assert_eq!(resp.public_state.current_player(), Some("Bot_2"));
    assert_eq!(resp.messages.len(), 1);
}

#[tokio::test]
async fn conflict_is_a_value_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/game/step"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"detail": "not your turn for description"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(server.uri()).unwrap();
    let outcome = client
        .step(&sid(), &StepAction::single_ai_turn())
        .await
        .unwrap();
    assert_matches!(outcome, StepOutcome::Conflict { body } if body.contains("not your turn"));
}

#[tokio::test]
async fn server_error_is_fatal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/game/step"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(server.uri()).unwrap();
    let err = client
        .step(&sid(), &StepAction::single_ai_turn())
        .await
        .unwrap_err();
    assert_matches!(err, StepError::Status { status: 500, ref body, .. } if body == "boom");
}

#[tokio::test]
async fn missing_phase_is_a_decode_error() {
    let server = MockServer::start().await;
    let mut body = response_body("DESCRIPTION", "P1");
    if let Some(obj) = body.as_object_mut() {
        obj.remove("phase");
    }
    Mock::given(method("POST"))
        .and(path("/game/step"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = HttpClient::new(server.uri()).unwrap();
    let err = client
        .step(&sid(), &StepAction::single_ai_turn())
        .await
        .unwrap_err();
    assert_matches!(err, StepError::Decode(msg) if msg.contains("phase"));
}

#[tokio::test]
async fn start_conflict_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/game/start"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"detail": "session busy"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(server.uri()).unwrap();
    let req = StartRequest {
        session_id: sid(),
        participant_name: "P1".to_string(),
        ai_count: 3,
        use_fool: true,
    };
    let err = client.start(&req).await.unwrap_err();
    assert_matches!(err, StepError::Status { status: 409, .. });
}

#[tokio::test]
async fn start_through_web_proxy_route() {
    let server = MockServer::start().await;
    let mut body = response_body("ENDED", "P1");
    body["result"] = json!({
        "winnerSide": "citizens",
        "liar": "Bot_1",
        "suspect": "Bot_1",
        "keyword": "apple",
        "topic": "Fruit",
        "votes": {"P1": "Bot_1", "Bot_2": "Bot_1"}
    });
    Mock::given(method("POST"))
        .and(path("/api/game/start"))
        .and(body_json(json!({
            "sessionId": "sess-1",
            "participantName": "P1",
            "aiCount": 3,
            "useFool": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(format!("{}/api", server.uri())).unwrap();
    assert_eq!(client.path_style(), PathStyle::WebProxy);
    let req = StartRequest {
        session_id: sid(),
        participant_name: "P1".to_string(),
        ai_count: 3,
        use_fool: true,
    };
    let resp = client.start(&req).await.unwrap();
    let result = resp.result.unwrap();
    assert_eq!(result.winner_side, Some(WinnerSide::Citizens));
    assert_eq!(result.votes.get("P1").map(String::as_str), Some("Bot_1"));
}

#[tokio::test]
async fn truncated_body_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let _ = socket.read(&mut buf).await;
        // Promise more bytes than are sent, then hang up.
        let _ = socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 512\r\n\r\n{\"phase\":",
            )
            .await;
    });

    let client = HttpClient::new(format!("http://{addr}")).unwrap();
    let err = client
        .step(&sid(), &StepAction::single_ai_turn())
        .await
        .unwrap_err();
    assert_matches!(err, StepError::Http(_));
}
