use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::api::Result;
use crate::api::StepBackend;
use crate::api::StepError;
use crate::api::StepOutcome;
use crate::types::ApiMessage;
use crate::types::GameResult;
use crate::types::MID_CHECK_NEED;
use crate::types::Phase;
use crate::types::PlayerInfo;
use crate::types::PrivateState;
use crate::types::PublicState;
use crate::types::Role;
use crate::types::Sender;
use crate::types::ServerResponse;
use crate::types::SessionId;
use crate::types::StartRequest;
use crate::types::StepAction;
use crate::types::TurnInfo;
use crate::types::UiSignal;

/// One scripted answer to a step call.
#[derive(Clone, Debug)]
pub enum Scripted {
    Respond(ServerResponse),
    Conflict,
    Fail(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedCall {
    Start(StartRequest),
    Step(StepAction),
}

#[derive(Default)]
struct Script {
    start: Option<ServerResponse>,
    steps: VecDeque<Scripted>,
    calls: Vec<RecordedCall>,
}

/// In-memory backend that answers from a script and records every call,
/// including how many were outstanding at once.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(start: ServerResponse) -> Self {
        let backend = Self::default();
        backend.lock().start = Some(start);
        backend
    }

    /// Every call sleeps this long before answering, which leaves room for
    /// competing triggers to observe the call as outstanding.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, answer: Scripted) -> &Self {
        self.lock().steps.push_back(answer);
        self
    }

    pub fn respond(&self, resp: ServerResponse) -> &Self {
        self.push(Scripted::Respond(resp))
    }

    pub fn conflict(&self) -> &Self {
        self.push(Scripted::Conflict)
    }

    pub fn fail(&self, msg: impl Into<String>) -> &Self {
        self.push(Scripted::Fail(msg.into()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn step_calls(&self) -> Vec<StepAction> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Step(action) => Some(action.clone()),
                RecordedCall::Start(_) => None,
            })
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl StepBackend for ScriptedBackend {
    async fn start(&self, req: &StartRequest) -> Result<ServerResponse> {
        let _guard = self.enter().await;
        let mut script = self.lock();
        script.calls.push(RecordedCall::Start(req.clone()));
        script
            .start
            .clone()
            .ok_or_else(|| StepError::Msg("no start response scripted".to_string()))
    }

    async fn step(&self, _session_id: &SessionId, action: &StepAction) -> Result<StepOutcome> {
        let _guard = self.enter().await;
        let mut script = self.lock();
        script.calls.push(RecordedCall::Step(action.clone()));
        match script.steps.pop_front() {
            Some(Scripted::Respond(resp)) => Ok(StepOutcome::Applied(Box::new(resp))),
            Some(Scripted::Conflict) => Ok(StepOutcome::Conflict {
                body: r#"{"detail":"not your turn"}"#.to_string(),
            }),
            Some(Scripted::Fail(msg)) => Err(StepError::Msg(msg)),
            None => Err(StepError::Msg(format!(
                "script exhausted at {} step",
                action.kind()
            ))),
        }
    }
}

/// Builder for plausible service responses. Defaults to a four-player game
/// (the local participant plus `Bot_1`..`Bot_3`) about animals.
#[derive(Clone, Debug)]
pub struct ResponseFixture {
    resp: ServerResponse,
}

impl ResponseFixture {
    pub fn new(phase: Phase, me: &str, current: Option<&str>) -> Self {
        let mut players = vec![PlayerInfo {
            name: me.to_string(),
            is_ai: false,
        }];
        players.extend((1..=3).map(|i| PlayerInfo {
            name: format!("Bot_{i}"),
            is_ai: true,
        }));
        let order: Vec<String> = players.iter().map(|p| p.name.clone()).collect();
        let index = current
            .and_then(|c| order.iter().position(|n| n == c))
            .unwrap_or(0);
        Self {
            resp: ServerResponse {
                phase,
                public_state: PublicState {
                    round: 1,
                    topic: Some("Animals".to_string()),
                    players,
                    turn: Some(TurnInfo {
                        order,
                        index,
                        current_player: current.map(str::to_string),
                    }),
                },
                private_state: PrivateState {
                    my_name: Some(me.to_string()),
                    role: Some(Role::Citizen),
                    keyword: Some("cat".to_string()),
                },
                ui: UiSignal::default(),
                messages: Vec::new(),
                result: None,
            },
        }
    }

    pub fn message(mut self, sender: Sender, name: &str, content: &str) -> Self {
        self.resp.messages.push(ApiMessage {
            sender,
            name: name.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn ai(self, name: &str, content: &str) -> Self {
        self.message(Sender::Ai, name, content)
    }

    pub fn need_mid_check(mut self) -> Self {
        self.resp.ui.need = Some(MID_CHECK_NEED.to_string());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.resp.private_state.role = Some(role);
        if role == Role::Liar {
            self.resp.private_state.keyword = Some("???".to_string());
        }
        self
    }

    pub fn result(mut self, result: GameResult) -> Self {
        self.resp.result = Some(result);
        self
    }

    pub fn build(self) -> ServerResponse {
        self.resp
    }
}
