//! The game session orchestrator.
//!
//! One [`Orchestrator`] drives one session against a [`StepBackend`]. It owns
//! the last authoritative snapshot, the open checkpoint, the pending echo and
//! the two re-entrancy guards (`step_in_flight`, `pumping`). All state sits
//! behind a single mutex that is never held across an await, so every
//! read-modify-write between two suspension points is atomic.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use chrono::Utc;
use liar_step_client::Phase;
use liar_step_client::ServerResponse;
use liar_step_client::SessionId;
use liar_step_client::StartRequest;
use liar_step_client::StepAction;
use liar_step_client::StepBackend;
use liar_step_client::StepOutcome;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::SessionConfig;
use crate::delivery::DeliveryQueue;
use crate::delivery::TranscriptEntry;
use crate::delivery::Utterance;
use crate::echo::EchoDeduplicator;
use crate::error::Result;
use crate::error::SessionErr;
use crate::event::EventSender;
use crate::event::SessionEvent;
use crate::gate::CheckpointGate;
use crate::gate::Gate;
use crate::gate::IntroKind;
use crate::gate::InterviewPrompt;
use crate::phase::SessionState;
use crate::pump;
use crate::pump::PumpBudget;
use crate::pump::PumpInputs;
use crate::pump::PumpReport;
use crate::pump::PumpRun;
use crate::pump::PumpStop;
use crate::store::Choice;
use crate::store::EndedSnapshot;
use crate::store::InterviewAnswer;
use crate::store::SessionStore;
use crate::view::AI_COMPOSING_STATUS;
use crate::view::SessionView;

const CONFIDENCE_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Work a front-end hands to [`Orchestrator::dispatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    SendMessage(String),
    Pump,
    AcknowledgeIntro,
    SubmitMidCheck { suspect: String, confidence: u8 },
    SubmitFinalVote { target: String, confidence: u8 },
    SubmitInterview(String),
    ClearError,
}

#[derive(Default)]
struct OrchestratorState {
    session: SessionState,
    gate: CheckpointGate,
    echo: EchoDeduplicator,
    step_in_flight: bool,
    pumping: bool,
    /// One-way: set when the final vote is submitted, never reset.
    has_voted: bool,
    /// Set on send, cleared when a response hands the turn back.
    force_disabled: bool,
    loading: bool,
    error: Option<String>,
    mid_check: Option<Choice>,
    vote: Option<Choice>,
    interview: Option<InterviewAnswer>,
    /// ENDED arrived while the interview was open.
    deferred_end: Option<EndedSnapshot>,
}

impl OrchestratorState {
    fn gate_blocks(&self) -> bool {
        self.gate.current().blocks_pump()
    }

    fn is_my_turn(&self) -> bool {
        self.session.is_my_turn(self.gate_blocks())
    }

    fn pump_inputs(&self) -> PumpInputs {
        PumpInputs {
            phase: self.session.phase(),
            gate: self.gate.current(),
            mid_check_needed: self.session.needs_mid_check(),
            human_turn: self.session.is_human_turn(),
            has_voted: self.has_voted,
            pumping: self.pumping,
        }
    }

    fn validate_choice(&self, target: &str, confidence: u8) -> std::result::Result<(), String> {
        if !CONFIDENCE_RANGE.contains(&confidence) {
            return Err(format!("confidence {confidence} outside 1..=5"));
        }
        if !self.session.candidates().iter().any(|c| c == target) {
            return Err(format!("`{target}` is not an AI player"));
        }
        Ok(())
    }

    fn view(&self) -> SessionView {
        let snap = self.session.snapshot();
        let ended = self.session.is_ended();
        let is_my_turn = self.is_my_turn();
        let ai_turn = self.session.is_ai_turn(self.gate_blocks());
        let turn = self.session.turn();
        SessionView {
            phase: self.session.phase(),
            phase_label: self.session.phase().map(Phase::label),
            round: snap.map(|s| s.public_state.round),
            topic: snap.and_then(|s| s.public_state.topic.clone()),
            current_player: if ended { None } else { turn.current_player },
            my_name: turn.my_name,
            role: snap.and_then(|s| s.private_state.role),
            keyword: snap.and_then(|s| s.private_state.keyword.clone()),
            gate: self.gate.current(),
            candidates: self.session.candidates(),
            is_my_turn,
            input_enabled: is_my_turn && !self.force_disabled && self.error.is_none(),
            busy: self.pumping,
            status_text: (self.pumping || ai_turn).then_some(AI_COMPOSING_STATUS),
            loading: self.loading,
            error: self.error.clone(),
            has_voted: self.has_voted,
            ended,
        }
    }
}

struct Inner {
    backend: Arc<dyn StepBackend>,
    session_id: SessionId,
    config: SessionConfig,
    state: Mutex<OrchestratorState>,
    delivery: DeliveryQueue,
    events: EventSender,
    store: Option<SessionStore>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held while a start or step call is outstanding.
struct StepGuard {
    inner: Arc<Inner>,
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        self.inner.state().step_in_flight = false;
    }
}

/// Held while the pump loop runs; clears the composing indicator on exit,
/// including when the loop aborts with an error.
struct PumpGuard {
    inner: Arc<Inner>,
}

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.inner.state().pumping = false;
        self.inner.events.send(SessionEvent::BusyChanged(false));
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn StepBackend>,
        session_id: SessionId,
        config: SessionConfig,
        events: EventSender,
        store: Option<SessionStore>,
    ) -> Self {
        let delivery = DeliveryQueue::new(config.pacing, events.clone());
        Self {
            inner: Arc::new(Inner {
                backend,
                session_id,
                config,
                state: Mutex::new(OrchestratorState::default()),
                delivery,
                events,
                store,
            }),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.inner.state()
    }

    fn emit(&self, event: SessionEvent) {
        self.inner.events.send(event);
    }

    pub fn view(&self) -> SessionView {
        self.state().view()
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.delivery.transcript()
    }

    /// Resolve once every received message has been revealed.
    pub async fn wait_delivered(&self) {
        self.inner.delivery.wait_idle().await;
    }

    /// Run `command` on a background task. An error ends up in the view's
    /// `error` field and as a [`SessionEvent::Fatal`].
    pub fn dispatch(&self, command: Command) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(err) = this.run(command).await {
                this.report_fatal(&err);
            }
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Start => self.start().await,
            Command::SendMessage(text) => self.send_message(&text).await.map(drop),
            Command::Pump => self.pump().await.map(drop),
            Command::AcknowledgeIntro => self.acknowledge_intro().await.map(drop),
            Command::SubmitMidCheck {
                suspect,
                confidence,
            } => self.submit_mid_check(&suspect, confidence).await.map(drop),
            Command::SubmitFinalVote { target, confidence } => {
                self.submit_final_vote(&target, confidence).await.map(drop)
            }
            Command::SubmitInterview(reason) => self.submit_interview(&reason).await.map(drop),
            Command::ClearError => {
                self.clear_error();
                Ok(())
            }
        }
    }

    pub fn report_fatal(&self, err: &SessionErr) {
        error!("session error: {err}");
        let msg = err.to_string();
        self.state().error = Some(msg.clone());
        self.emit(SessionEvent::Fatal(msg));
    }

    /// Manual retry: forget the error. The failed action is not replayed.
    pub fn clear_error(&self) {
        self.state().error = None;
        self.emit(SessionEvent::SessionUpdated);
    }

    fn begin_step(&self, st: &mut OrchestratorState) -> Option<StepGuard> {
        if st.step_in_flight {
            debug!("step declined: another call is in flight");
            return None;
        }
        if st.session.is_ended() {
            debug!("step declined: session has ended");
            return None;
        }
        st.step_in_flight = true;
        Some(StepGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    fn try_begin_step(&self) -> Option<StepGuard> {
        let mut st = self.state();
        self.begin_step(&mut st)
    }

    async fn call_step(&self, guard: StepGuard, action: StepAction) -> Result<StepOutcome> {
        debug!(action = action.kind(), "step");
        let outcome = self
            .inner
            .backend
            .step(&self.inner.session_id, &action)
            .await?;
        match &outcome {
            StepOutcome::Applied(resp) => self.apply_response((**resp).clone()),
            StepOutcome::Conflict { body } => {
                debug!(action = action.kind(), %body, "step conflict");
            }
        }
        drop(guard);
        Ok(outcome)
    }

    fn open_gate(st: &mut OrchestratorState, gate: Gate, events: &mut Vec<SessionEvent>) {
        if st.gate.current() == gate {
            return;
        }
        if let Some(prev) = st.gate.open(gate) {
            events.push(SessionEvent::CheckpointClosed(prev));
        }
        events.push(SessionEvent::CheckpointOpened(gate));
    }

    fn ended_snapshot(&self, st: &OrchestratorState, response: ServerResponse) -> EndedSnapshot {
        EndedSnapshot {
            session_id: self.inner.session_id.clone(),
            response,
            vote: st.vote.clone(),
            mid_check: st.mid_check.clone(),
            interview: st.interview.clone(),
            ended_at: Utc::now(),
        }
    }

    /// Make `resp` the new truth and derive the side transitions from it.
    fn apply_response(&self, resp: ServerResponse) {
        let arrived_at = Utc::now();
        let mut events = Vec::new();
        let (entries, hand_off) = {
            let mut st = self.state();
            if st.session.is_ended() {
                info!("ignoring response for an ended session");
                return;
            }
            let full = (resp.phase == Phase::Ended).then(|| resp.clone());
            let mut resp = resp;
            let messages = st.echo.reconcile(std::mem::take(&mut resp.messages));
            let needs_mid_check = resp.needs_mid_check();
            let phase = resp.phase;

            let transition = st.session.apply(resp);
            if transition.changed() {
                info!(from = ?transition.from, to = ?transition.to, "phase transition");
            }

            // An open intro stays up; closing it opens whatever the snapshot
            // still asks for.
            let intro_open = matches!(st.gate.current(), Gate::PhaseInfo(_));
            if !intro_open {
                if needs_mid_check {
                    Self::open_gate(&mut st, Gate::MidCheck, &mut events);
                } else if phase == Phase::Voting && !st.has_voted {
                    Self::open_gate(&mut st, Gate::FinalVote, &mut events);
                }
            }

            let mut hand_off = None;
            if let Some(full) = full {
                if let Some(closed) = st.gate.close_ai_tally() {
                    events.push(SessionEvent::CheckpointClosed(closed));
                }
                let snapshot = self.ended_snapshot(&st, full);
                if matches!(st.gate.current(), Gate::PostVoteInterview(_)) {
                    info!("game ended during the interview; deferring hand-off");
                    st.deferred_end = Some(snapshot);
                } else {
                    hand_off = Some(snapshot);
                }
            }

            if st.is_my_turn() {
                st.force_disabled = false;
            }

            let my_name = st.session.turn().my_name;
            let entries: Vec<TranscriptEntry> = messages
                .into_iter()
                .map(|m| {
                    TranscriptEntry::render(Utterance::from_api(m, arrived_at), my_name.as_deref())
                })
                .collect();
            (entries, hand_off)
        };

        self.inner.delivery.enqueue(entries);
        self.emit(SessionEvent::SessionUpdated);
        for event in events {
            self.emit(event);
        }
        if let Some(snapshot) = hand_off {
            self.hand_off(snapshot);
        }
    }

    fn hand_off(&self, snapshot: EndedSnapshot) {
        info!(session_id = %snapshot.session_id, "session ended; handing off final payload");
        if let Some(store) = &self.inner.store
            && let Err(err) = store.write_last_ended(&snapshot)
        {
            error!("failed to persist ended payload: {err}");
        }
        self.emit(SessionEvent::Ended(Box::new(snapshot)));
    }

    fn open_intro(&self, kind: IntroKind) -> bool {
        let opened = self.state().gate.try_open_intro(kind);
        if opened {
            self.emit(SessionEvent::CheckpointOpened(Gate::PhaseInfo(kind)));
        }
        opened
    }

    fn set_loading(&self, loading: bool) {
        self.state().loading = loading;
        self.emit(SessionEvent::SessionUpdated);
    }

    /// Start the game, then show the explanation intro once. Automatic play
    /// begins when the intro is acknowledged.
    pub async fn start(&self) -> Result<()> {
        let step = {
            let mut st = self.state();
            if st.session.is_started() {
                warn!("start ignored: session already started");
                return Ok(());
            }
            match self.begin_step(&mut st) {
                Some(step) => step,
                None => return Ok(()),
            }
        };
        let req = StartRequest {
            session_id: self.inner.session_id.clone(),
            participant_name: self.inner.config.participant_name.clone(),
            ai_count: self.inner.config.ai_count,
            use_fool: self.inner.config.use_fool,
        };
        info!(session_id = %req.session_id, participant = %req.participant_name, "starting game");
        self.set_loading(true);
        let result = self.inner.backend.start(&req).await;
        self.set_loading(false);
        let resp = result?;
        self.apply_response(resp);
        drop(step);

        if self.open_intro(IntroKind::Explanation) {
            return Ok(());
        }
        self.pump().await?;
        Ok(())
    }

    /// Auto-advance AI turns with the normal iteration cap.
    pub async fn pump(&self) -> Result<PumpRun> {
        self.pump_with(PumpBudget::Normal).await
    }

    async fn pump_with(&self, budget: PumpBudget) -> Result<PumpRun> {
        let guard = {
            let mut st = self.state();
            if let Err(blocked) = pump::check_start(&st.pump_inputs()) {
                debug!(?blocked, "pump not started");
                return Ok(PumpRun::Blocked(blocked));
            }
            st.pumping = true;
            PumpGuard {
                inner: Arc::clone(&self.inner),
            }
        };
        self.emit(SessionEvent::BusyChanged(true));

        let max = budget.max_iterations(&self.inner.config);
        let mut steps = 0;
        let stop = loop {
            if steps >= max {
                break PumpStop::BudgetExhausted;
            }
            let inputs = self.state().pump_inputs();
            if let Err(blocked) = pump::check_continue(&inputs) {
                break PumpStop::Blocked(blocked);
            }
            let Some(step) = self.try_begin_step() else {
                break PumpStop::StepDeclined;
            };
            let outcome = self.call_step(step, StepAction::single_ai_turn()).await?;
            steps += 1;
            let has_voted = self.state().has_voted;
            if let Some(stop) = pump::stop_after(&outcome, has_voted) {
                break stop;
            }
            tokio::time::sleep(self.inner.config.pump_tick).await;
        };
        debug!(steps, ?stop, ?budget, "pump finished");
        drop(guard);
        Ok(PumpRun::Ran(PumpReport { steps, stop }))
    }

    /// Send the participant's chat line for the current speaking phase.
    ///
    /// Returns `true` when a step call was issued. Outside the participant's
    /// turn this pumps instead.
    pub async fn send_message(&self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty message");
            return Ok(false);
        }
        let my_turn = self.state().is_my_turn();
        if !my_turn {
            debug!("not the participant's turn; pumping instead of sending");
            self.pump().await?;
            return Ok(false);
        }

        let (step, action, entry) = {
            let mut st = self.state();
            if st.force_disabled || st.error.is_some() {
                debug!("send ignored: input disabled");
                return Ok(false);
            }
            let action = match st.session.phase() {
                Some(Phase::Description) => StepAction::Description {
                    text: text.to_string(),
                    max_ai_steps: Some(0),
                },
                Some(Phase::Discussion) => StepAction::Discussion {
                    text: text.to_string(),
                    max_ai_steps: Some(0),
                },
                _ => return Ok(false),
            };
            let Some(step) = self.begin_step(&mut st) else {
                return Ok(false);
            };
            st.force_disabled = true;
            let name = st
                .session
                .turn()
                .my_name
                .unwrap_or_else(|| "You".to_string());
            st.echo.record(name.as_str(), text);
            (step, action, TranscriptEntry::local_user(&name, text))
        };
        self.inner.delivery.render_now(entry);
        self.emit(SessionEvent::SessionUpdated);

        self.call_step(step, action).await?;
        self.pump().await?;
        Ok(true)
    }

    /// Close the open phase intro and resume automatic play. A repeated
    /// close finds nothing to close and does not resume again.
    pub async fn acknowledge_intro(&self) -> Result<bool> {
        let mut events = Vec::new();
        {
            let mut st = self.state();
            let Some(gate) = st.gate.close_intro() else {
                debug!("no intro open; ignoring close");
                return Ok(false);
            };
            events.push(SessionEvent::CheckpointClosed(gate));
            // An intro may have displaced a checkpoint the snapshot still asks for.
            if st.session.needs_mid_check() {
                Self::open_gate(&mut st, Gate::MidCheck, &mut events);
            } else if st.session.phase() == Some(Phase::Voting) && !st.has_voted {
                Self::open_gate(&mut st, Gate::FinalVote, &mut events);
            }
        }
        for event in events {
            self.emit(event);
        }
        self.pump().await?;
        Ok(true)
    }

    /// Record the mid-game suspect. The discussion intro, when still due,
    /// opens before the call and holds automatic play until acknowledged.
    pub async fn submit_mid_check(&self, suspect: &str, confidence: u8) -> Result<bool> {
        let mut events = Vec::new();
        let step = {
            let mut st = self.state();
            if st.gate.current() != Gate::MidCheck {
                warn!("mid-check submission ignored: dialog not open");
                return Ok(false);
            }
            if let Err(reason) = st.validate_choice(suspect, confidence) {
                warn!("mid-check submission rejected: {reason}");
                return Ok(false);
            }
            let Some(step) = self.begin_step(&mut st) else {
                return Ok(false);
            };
            if let Some(closed) = st.gate.close_mid_check() {
                events.push(SessionEvent::CheckpointClosed(closed));
            }
            st.mid_check = Some(Choice {
                target: suspect.to_string(),
                confidence,
            });
            if st.gate.try_open_intro(IntroKind::Discussion) {
                events.push(SessionEvent::CheckpointOpened(Gate::PhaseInfo(
                    IntroKind::Discussion,
                )));
            }
            step
        };
        for event in events {
            self.emit(event);
        }

        self.call_step(
            step,
            StepAction::MidCheck {
                suspect_name: suspect.to_string(),
                confidence,
            },
        )
        .await?;
        // Blocked while the discussion intro is open; its close resumes.
        self.pump().await?;
        Ok(true)
    }

    /// Cast the final vote, then let the AI players vote through to ENDED.
    pub async fn submit_final_vote(&self, target: &str, confidence: u8) -> Result<bool> {
        let mut events = Vec::new();
        let (step, interview) = {
            let mut st = self.state();
            if st.gate.current() != Gate::FinalVote {
                warn!("vote submission ignored: dialog not open");
                return Ok(false);
            }
            if let Err(reason) = st.validate_choice(target, confidence) {
                warn!("vote submission rejected: {reason}");
                return Ok(false);
            }
            let Some(step) = self.begin_step(&mut st) else {
                return Ok(false);
            };
            if let Some(closed) = st.gate.close_final_vote() {
                events.push(SessionEvent::CheckpointClosed(closed));
            }
            st.has_voted = true;
            st.vote = Some(Choice {
                target: target.to_string(),
                confidence,
            });
            let next = if self.inner.config.post_vote_interview {
                let suspect = st.mid_check.as_ref().map(|c| c.target.as_str());
                Gate::PostVoteInterview(InterviewPrompt::for_choices(suspect, Some(target)))
            } else {
                Gate::AiTally
            };
            Self::open_gate(&mut st, next, &mut events);
            (step, matches!(next, Gate::PostVoteInterview(_)))
        };
        for event in events {
            self.emit(event);
        }

        self.call_step(
            step,
            StepAction::Vote {
                target_name: target.to_string(),
                confidence,
                max_ai_steps: Some(0),
            },
        )
        .await?;
        if !interview {
            self.pump_with(PumpBudget::AfterVote).await?;
        }
        Ok(true)
    }

    /// Answer the post-vote interview, then show the AI tally and finish.
    pub async fn submit_interview(&self, reason: &str) -> Result<bool> {
        let reason = reason.trim();
        let mut events = Vec::new();
        let hand_off = {
            let mut st = self.state();
            let Gate::PostVoteInterview(prompt) = st.gate.current() else {
                warn!("interview submission ignored: dialog not open");
                return Ok(false);
            };
            if reason.is_empty() {
                debug!("ignoring empty interview answer");
                return Ok(false);
            }
            st.interview = Some(InterviewAnswer {
                reason: reason.to_string(),
                same_choice: prompt.same_choice(),
            });
            match st.deferred_end.take() {
                Some(mut snapshot) => {
                    if let Some(closed) = st.gate.close_interview() {
                        events.push(SessionEvent::CheckpointClosed(closed));
                    }
                    snapshot.interview = st.interview.clone();
                    Some(snapshot)
                }
                None => {
                    Self::open_gate(&mut st, Gate::AiTally, &mut events);
                    None
                }
            }
        };
        for event in events {
            self.emit(event);
        }

        if let Some(snapshot) = hand_off {
            self.hand_off(snapshot);
            return Ok(true);
        }
        self.pump_with(PumpBudget::AfterVote).await?;
        Ok(true)
    }
}
