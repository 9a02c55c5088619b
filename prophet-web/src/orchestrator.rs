//! Run orchestration: plan, then run, then fold the event stream
//!
//! [`RunOrchestrator`] owns the lifecycle and every per-run accumulator. It
//! is driven by one task: each streamed event is dispatched to completion
//! before the next one is pulled, and every mutation is announced on a
//! broadcast channel so views can redraw from the read-only accessors.

use std::sync::Arc;

use futures::StreamExt;
use prophet_web_sdk::{
    AgentBackend, AgentEvent, BoardEntry, FrameStream, Observation, PlanRequest, RunEnd,
    RunRequest, ToolKind, UserSettings,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::board::BoardState;
use crate::decoder::decode_frame;
use crate::registry::SourceRegistry;
use crate::searches::{SearchAggregator, SearchGroup};
use crate::transcript::{ChatMessage, MessageKind, Transcript};

/// Where the plan/run cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Planning,
    /// A plan is waiting for the user to commit; a new prompt is also allowed
    PlanReady,
    Running,
}

/// Budget announced by the agent when the run starts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunLimits {
    pub step_limit: u32,
    pub cost_limit: f64,
}

/// Spend reported with the latest step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepCosts {
    pub model_cost: f64,
    pub search_cost: f64,
    pub total_cost: f64,
}

/// Process-wide state of the current plan/run cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLifecycle {
    pub phase: RunPhase,
    /// Never decreases within a run; reset to 0 when a run starts
    pub step: u32,
    pub run_id: Option<String>,
    pub limits: Option<RunLimits>,
    pub costs: StepCosts,
}

/// Whether an entry point accepted the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected,
}

/// Change notifications for views
#[derive(Debug, Clone)]
pub enum RunUpdate {
    /// Per-run accumulators were emptied for a new run
    Reset,
    SearchGroupAdded(SearchGroup),
    /// Full board after the change
    BoardChanged(Vec<BoardEntry>),
    MessageAppended(ChatMessage),
    PhaseChanged(RunPhase),
}

struct RunSession {
    run_id: String,
    frames: FrameStream,
}

/// Drives one plan/run cycle at a time against an [`AgentBackend`]
pub struct RunOrchestrator {
    backend: Arc<dyn AgentBackend>,
    lifecycle: RunLifecycle,
    searches: SearchAggregator,
    board: BoardState,
    transcript: Transcript,
    session: Option<RunSession>,
    updates_tx: broadcast::Sender<RunUpdate>,
}

impl RunOrchestrator {
    pub fn new(backend: Arc<dyn AgentBackend>) -> Self {
        // Create broadcast channel for updates (capacity 1000)
        let (updates_tx, _) = broadcast::channel(1000);
        Self {
            backend,
            lifecycle: RunLifecycle::default(),
            searches: SearchAggregator::new(),
            board: BoardState::new(),
            transcript: Transcript::new(),
            session: None,
            updates_tx,
        }
    }

    /// Receive every change made from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RunUpdate> {
        self.updates_tx.subscribe()
    }

    pub fn phase(&self) -> RunPhase {
        self.lifecycle.phase
    }

    /// True while planning or running; new requests are refused meanwhile
    pub fn is_busy(&self) -> bool {
        matches!(self.lifecycle.phase, RunPhase::Planning | RunPhase::Running)
    }

    pub fn lifecycle(&self) -> &RunLifecycle {
        &self.lifecycle
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn board(&self) -> &[BoardEntry] {
        self.board.entries()
    }

    pub fn board_entry(&self, id: i64) -> Option<&BoardEntry> {
        self.board.get(id)
    }

    pub fn search_groups(&self) -> &[SearchGroup] {
        self.searches.groups()
    }

    pub fn groups_for_step(&self, step: u32) -> impl Iterator<Item = &SearchGroup> {
        self.searches.groups_for_step(step)
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.searches.registry()
    }

    /// Whether a stream session is open
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    // ========================================================================
    // Planning
    // ========================================================================

    /// Ask the planner to turn a prompt into a forecasting problem.
    ///
    /// The user message is appended before the request goes out. Always ends
    /// in `PlanReady` or `Idle`.
    pub async fn plan(&mut self, prompt: &str, settings: &UserSettings) -> Admission {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            tracing::debug!("ignoring blank prompt");
            return Admission::Rejected;
        }
        if self.is_busy() {
            tracing::debug!(phase = ?self.lifecycle.phase, "plan rejected while busy");
            return Admission::Rejected;
        }

        self.append(MessageKind::User {
            content: prompt.to_string(),
        });
        self.set_phase(RunPhase::Planning);

        let request = PlanRequest {
            prompt: prompt.to_string(),
            settings: settings.clone(),
        };
        let outcome = match self.backend.plan(&request).await {
            Ok(response) => response.into_plan(),
            Err(e) if e.is_network() => {
                tracing::warn!(error = %e, "plan request failed");
                Err(format!("Network error: {}", e))
            }
            Err(e) => {
                tracing::warn!(error = %e, "plan request rejected");
                Err(format!("Failed to generate a forecasting plan: {}", e))
            }
        };

        match outcome {
            Ok(plan) => {
                tracing::info!(title = %plan.title, outcomes = plan.outcomes.len(), "plan ready");
                self.append(MessageKind::Plan {
                    title: plan.title,
                    outcomes: plan.outcomes,
                });
                self.set_phase(RunPhase::PlanReady);
            }
            Err(content) => {
                self.append(MessageKind::Error { content });
                self.set_phase(RunPhase::Idle);
            }
        }
        Admission::Accepted
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Launch a run for a committed plan and open its event stream.
    ///
    /// Rejected while a plan or a run is in flight. Drive the opened stream
    /// with [`pump`](Self::pump) or [`drive`](Self::drive).
    pub async fn start_run(
        &mut self,
        title: &str,
        outcomes: &[String],
        settings: &UserSettings,
    ) -> Admission {
        if self.is_busy() {
            tracing::debug!(phase = ?self.lifecycle.phase, "start_run rejected while busy");
            return Admission::Rejected;
        }

        self.session = None;
        self.searches.clear();
        self.board.clear();
        self.lifecycle.step = 0;
        self.lifecycle.run_id = None;
        self.lifecycle.limits = None;
        self.lifecycle.costs = StepCosts::default();
        let _ = self.updates_tx.send(RunUpdate::Reset);

        self.append(MessageKind::Divider);
        self.set_phase(RunPhase::Running);

        let request = RunRequest {
            title: title.to_string(),
            outcomes: outcomes.to_vec(),
            settings: settings.clone(),
        };
        let run_id = match self.backend.create_run(&request).await {
            Ok(created) => created.run_id,
            Err(e) => {
                tracing::warn!(error = %e, "run creation failed");
                self.fail_start(format!("Failed to start agent: {}", e));
                return Admission::Accepted;
            }
        };

        match self.backend.open_stream(&run_id).await {
            Ok(frames) => {
                tracing::info!(run_id = %run_id, "run stream opened");
                self.lifecycle.run_id = Some(run_id.clone());
                self.session = Some(RunSession { run_id, frames });
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "could not open run stream");
                self.fail_start(format!("Failed to start agent: {}", e));
            }
        }
        Admission::Accepted
    }

    /// Pull and dispatch one frame. Returns false once no session is open.
    ///
    /// A transport error, or the stream ending before `run_end`, abandons the
    /// run and returns to `Idle`.
    pub async fn pump(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let next = session.frames.next().await;

        match next {
            Some(Ok(frame)) => {
                if let Some(event) = decode_frame(&frame) {
                    self.dispatch(event);
                }
            }
            Some(Err(e)) => self.abandon(format!("Lost connection to the agent: {}", e)),
            None => self.abandon("The agent stream ended before the run finished.".to_string()),
        }
        self.session.is_some()
    }

    /// Dispatch frames until the session closes
    pub async fn drive(&mut self) {
        while self.pump().await {}
    }

    /// Close the open session, if any, and return to `Idle`. Nothing already
    /// applied is rolled back.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(run_id = %session.run_id, "run stream closed by client");
        }
        if self.lifecycle.phase == RunPhase::Running {
            self.set_phase(RunPhase::Idle);
        }
    }

    // ========================================================================
    // Event dispatch
    // ========================================================================

    /// Fold one decoded event into the lifecycle, searches, board and transcript
    pub fn dispatch(&mut self, event: AgentEvent) {
        tracing::trace!(kind = event.kind(), step = self.lifecycle.step, "dispatch");
        match event {
            AgentEvent::RunStart {
                step_limit,
                cost_limit,
                ..
            } => {
                self.lifecycle.limits = Some(RunLimits {
                    step_limit,
                    cost_limit,
                });
            }
            AgentEvent::StepStart {
                step,
                model_cost,
                search_cost,
                total_cost,
            } => {
                self.lifecycle.step = self.lifecycle.step.max(step);
                self.lifecycle.costs = StepCosts {
                    model_cost,
                    search_cost,
                    total_cost,
                };
            }
            AgentEvent::ModelResponse {
                content,
                thinking,
                actions,
            } => {
                if actions.is_empty() && !content.is_empty() {
                    self.append(MessageKind::Think {
                        step: self.lifecycle.step,
                        content,
                        thinking,
                    });
                }
            }
            AgentEvent::Observation(observation) => self.on_observation(observation),
            AgentEvent::RunEnd(run_end) => self.on_run_end(run_end),
        }
    }

    fn on_observation(&mut self, observation: Observation) {
        let step = self.lifecycle.step;
        match observation.tool_kind() {
            ToolKind::Search => {
                let query = observation.query.unwrap_or_default();
                let results = observation.search_results.unwrap_or_default();
                let count = results.len();
                let group = self
                    .searches
                    .record(step, query, results, !observation.error)
                    .clone();
                let _ = self
                    .updates_tx
                    .send(RunUpdate::SearchGroupAdded(group.clone()));
                self.append(MessageKind::Search {
                    step,
                    query: group.query,
                    count,
                    results: group.results,
                });
            }
            ToolKind::AddSource => {
                let placement = self
                    .board
                    .apply_add_source(&observation, self.searches.registry());
                if placement.placed {
                    self.board_changed();
                }
                self.append(MessageKind::AddSource {
                    step,
                    source_id: observation.source_id.unwrap_or_default(),
                    note: observation.note.unwrap_or_default(),
                    board_id: placement.board_id,
                });
            }
            ToolKind::EditNote => {
                if self.board.apply_edit_note(&observation) {
                    self.board_changed();
                }
                self.append(MessageKind::EditNote {
                    step,
                    board_id: observation.board_id.unwrap_or(0),
                    new_note: observation.new_note.unwrap_or_default(),
                });
            }
            ToolKind::Submit | ToolKind::Other => {
                tracing::trace!(tool = %observation.tool, "observation has no transcript form");
            }
        }
    }

    fn on_run_end(&mut self, run_end: RunEnd) {
        if self.board.replace_with_snapshot(&run_end.board) {
            self.board_changed();
        }
        tracing::info!(
            exit_status = %run_end.exit_status,
            submitted = !run_end.submission.is_empty(),
            board = self.board.len(),
            "run finished"
        );
        self.append(MessageKind::Result {
            submission: run_end.submission,
            exit_status: run_end.exit_status,
            board: self.board.entries().to_vec(),
            error: run_end.error,
        });
        self.session = None;
        self.set_phase(RunPhase::Idle);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn fail_start(&mut self, content: String) {
        self.session = None;
        self.append(MessageKind::Error { content });
        self.set_phase(RunPhase::Idle);
    }

    fn abandon(&mut self, content: String) {
        let run_id = self.session.take().map(|s| s.run_id).unwrap_or_default();
        tracing::warn!(run_id = %run_id, reason = %content, "abandoning run");
        self.append(MessageKind::Error { content });
        self.set_phase(RunPhase::Idle);
    }

    fn append(&mut self, kind: MessageKind) {
        let message = self.transcript.push(kind).clone();
        let _ = self.updates_tx.send(RunUpdate::MessageAppended(message));
    }

    fn board_changed(&mut self) {
        let _ = self
            .updates_tx
            .send(RunUpdate::BoardChanged(self.board.entries().to_vec()));
    }

    fn set_phase(&mut self, phase: RunPhase) {
        if self.lifecycle.phase == phase {
            return;
        }
        tracing::debug!(from = ?self.lifecycle.phase, to = ?phase, "phase change");
        self.lifecycle.phase = phase;
        let _ = self.updates_tx.send(RunUpdate::PhaseChanged(phase));
    }
}
