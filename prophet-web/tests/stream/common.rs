//! Common test utilities for orchestrator tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use prophet_web::RunOrchestrator;
use prophet_web_sdk::{
    async_trait, AgentBackend, ClientError, FrameStream, PlanRequest, PlanResponse, Result,
    RunCreated, RunRequest, UserSettings,
};
use serde_json::{json, Value};

/// In-memory backend that replays canned responses in order.
///
/// Each call pops the next scripted answer; an exhausted script answers with
/// a network error.
#[derive(Default)]
pub struct ScriptedBackend {
    plans: Mutex<VecDeque<Result<PlanResponse>>>,
    runs: Mutex<VecDeque<Result<RunCreated>>>,
    streams: Mutex<VecDeque<Vec<Result<String>>>>,
    pub plan_requests: Mutex<Vec<PlanRequest>>,
    pub run_requests: Mutex<Vec<RunRequest>>,
    pub opened: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(self, response: Result<PlanResponse>) -> Self {
        self.plans.lock().unwrap().push_back(response);
        self
    }

    /// Script a successful launch whose stream yields `frames` then ends
    pub fn with_run(self, run_id: &str, frames: Vec<Result<String>>) -> Self {
        self.runs.lock().unwrap().push_back(Ok(RunCreated {
            run_id: run_id.to_string(),
        }));
        self.streams.lock().unwrap().push_back(frames);
        self
    }

    pub fn with_failed_run(self, error: ClientError) -> Self {
        self.runs.lock().unwrap().push_back(Err(error));
        self
    }
}

fn exhausted() -> ClientError {
    ClientError::Network("no scripted response".to_string())
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResponse> {
        self.plan_requests.lock().unwrap().push(request.clone());
        self.plans.lock().unwrap().pop_front().unwrap_or_else(|| Err(exhausted()))
    }

    async fn create_run(&self, request: &RunRequest) -> Result<RunCreated> {
        self.run_requests.lock().unwrap().push(request.clone());
        self.runs.lock().unwrap().pop_front().unwrap_or_else(|| Err(exhausted()))
    }

    async fn open_stream(&self, run_id: &str) -> Result<FrameStream> {
        self.opened.lock().unwrap().push(run_id.to_string());
        let frames = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(exhausted)?;
        Ok(futures::stream::iter(frames).boxed())
    }
}

/// Settings with the keys required by the defaults
pub fn settings() -> UserSettings {
    UserSettings {
        perplexity_api_key: "pk-test".to_string(),
        ..Default::default()
    }
}

pub fn outcomes() -> Vec<String> {
    vec!["Yes".to_string(), "No".to_string()]
}

pub fn orchestrator(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, RunOrchestrator) {
    let backend = Arc::new(backend);
    let orchestrator = RunOrchestrator::new(backend.clone());
    (backend, orchestrator)
}

/// Launch a run over `frames` and drive it until the session closes
pub async fn run_to_end(frames: Vec<Result<String>>) -> RunOrchestrator {
    let (_, mut orch) = orchestrator(ScriptedBackend::new().with_run("run-1", frames));
    orch.start_run("Will it rain tomorrow in City X?", &outcomes(), &settings())
        .await;
    orch.drive().await;
    orch
}

// ============================================================================
// Frame builders
// ============================================================================

pub fn frame(value: Value) -> Result<String> {
    Ok(value.to_string())
}

pub fn step_start(step: u32) -> Result<String> {
    frame(json!({"type": "step_start", "step": step}))
}

pub fn search(query: &str, results: Value) -> Result<String> {
    frame(json!({
        "type": "observation",
        "tool": "search",
        "error": false,
        "output_text": "",
        "query": query,
        "search_results": results,
    }))
}

pub fn add_source(source_id: &str, note: &str, output_text: &str) -> Result<String> {
    frame(json!({
        "type": "observation",
        "tool": "add_source",
        "error": false,
        "output_text": output_text,
        "source_id": source_id,
        "note": note,
    }))
}

pub fn edit_note(board_id: i64, new_note: &str) -> Result<String> {
    frame(json!({
        "type": "observation",
        "tool": "edit_note",
        "error": false,
        "output_text": format!("Note for #{} updated", board_id),
        "board_id": board_id,
        "new_note": new_note,
    }))
}

pub fn run_end(exit_status: &str, submission: Value, board: Value) -> Result<String> {
    frame(json!({
        "type": "run_end",
        "exit_status": exit_status,
        "submission": submission,
        "board": board,
    }))
}

/// One search result record
pub fn source(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "url": format!("https://news.example.com/{}", id),
        "snippet": format!("{} snippet", title),
    })
}
