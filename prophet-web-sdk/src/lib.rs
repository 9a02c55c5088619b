//! Wire protocol for the forecasting agent backend.
//!
//! The backend exposes three endpoints: a planner that turns a prompt into a
//! structured forecasting problem, a run launcher, and a per-run event
//! stream. This crate holds the request/response bodies, every event shape
//! the stream can carry, and the [`AgentBackend`] trait that clients drive.

mod error;
mod lenient;

pub use error::{ClientError, Result};

// Re-export async trait for convenience
pub use async_trait::async_trait;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Settings
// ============================================================================

/// Which model adapter the backend should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelClass {
    #[default]
    Litellm,
    Openrouter,
}

/// Which web search provider the agent's search tool uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    #[default]
    Perplexity,
    Brave,
}

/// User-provided settings sent with each plan and run request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub model_class: ModelClass,
    pub model_name: String,
    pub search_backend: SearchBackend,
    #[serde(default)]
    pub openrouter_api_key: String,
    #[serde(default)]
    pub perplexity_api_key: String,
    #[serde(default)]
    pub brave_api_key: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            model_class: ModelClass::Litellm,
            model_name: "google/gemini-2.5-flash-preview-05-20".to_string(),
            search_backend: SearchBackend::Perplexity,
            openrouter_api_key: String::new(),
            perplexity_api_key: String::new(),
            brave_api_key: String::new(),
        }
    }
}

impl UserSettings {
    /// Whether the keys needed by the selected model class and search backend are set
    pub fn has_required_keys(&self) -> bool {
        if self.model_class == ModelClass::Openrouter && self.openrouter_api_key.is_empty() {
            return false;
        }
        match self.search_backend {
            SearchBackend::Perplexity => !self.perplexity_api_key.is_empty(),
            SearchBackend::Brave => !self.brave_api_key.is_empty(),
        }
    }
}

// ============================================================================
// Requests and responses
// ============================================================================

/// Body of `POST /api/plan`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub prompt: String,
    pub settings: UserSettings,
}

/// Body returned by `POST /api/plan`.
///
/// Either `{"status": "success", "title": ..., "outcomes": [...]}` or
/// `{"status": "error", "message": ...}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub outcomes: Option<Vec<String>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A structured forecasting problem proposed by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPlan {
    pub title: String,
    pub outcomes: Vec<String>,
}

impl PlanResponse {
    pub const DEFAULT_FAILURE: &'static str = "Failed to generate a forecasting plan.";

    /// Accept the response only if it is a success with a title and at least one outcome.
    ///
    /// On rejection returns the human-readable cause to show the user.
    pub fn into_plan(self) -> std::result::Result<ForecastPlan, String> {
        match (self.status.as_str(), self.title, self.outcomes) {
            ("success", Some(title), Some(outcomes)) if !title.is_empty() && !outcomes.is_empty() => {
                Ok(ForecastPlan { title, outcomes })
            }
            _ => Err(self
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_FAILURE.to_string())),
        }
    }
}

/// Body of `POST /api/run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub title: String,
    pub outcomes: Vec<String>,
    pub settings: UserSettings,
}

/// Body returned by `POST /api/run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCreated {
    pub run_id: String,
}

// ============================================================================
// Sources and the board
// ============================================================================

/// One search-engine hit as reported by the agent's search tool.
///
/// `id` is opaque text assigned by the search tool; it is not guaranteed to
/// be numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSource {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub snippet: String,
}

/// The part of a search hit that a board entry embeds
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoardSource {
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub snippet: String,
}

impl From<&SearchSource> for BoardSource {
    fn from(source: &SearchSource) -> Self {
        Self {
            title: source.title.clone(),
            url: source.url.clone(),
            snippet: source.snippet.clone(),
        }
    }
}

/// How a piece of evidence bears on one outcome.
///
/// Tags outside the known vocabulary are kept verbatim as `Other` so a single
/// unexpected tag never invalidates a whole board snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
    Other(String),
}

impl Sentiment {
    pub fn as_str(&self) -> &str {
        match self {
            Sentiment::VeryPositive => "very_positive",
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::VeryNegative => "very_negative",
            Sentiment::Other(tag) => tag,
        }
    }

    /// Compact badge used in listings: `++`, `+`, `~`, `-`, `--`
    pub fn badge(&self) -> &str {
        match self {
            Sentiment::VeryPositive => "++",
            Sentiment::Positive => "+",
            Sentiment::Neutral => "~",
            Sentiment::Negative => "-",
            Sentiment::VeryNegative => "--",
            Sentiment::Other(tag) => tag,
        }
    }
}

impl From<String> for Sentiment {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "very_positive" => Sentiment::VeryPositive,
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            "very_negative" => Sentiment::VeryNegative,
            _ => Sentiment::Other(tag),
        }
    }
}

impl From<Sentiment> for String {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.as_str().to_string()
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One curated piece of evidence on the source board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardEntry {
    pub id: i64,
    pub source: BoardSource,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub note: String,
    /// Outcome label -> sentiment
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub reaction: BTreeMap<String, Sentiment>,
}

// ============================================================================
// Stream events
// ============================================================================

/// A tool call attached to a model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInfo {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// The tools the agent can report observations for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Search,
    AddSource,
    EditNote,
    Submit,
    Other,
}

impl ToolKind {
    pub fn parse(tool: &str) -> Self {
        match tool {
            "search" => ToolKind::Search,
            "add_source" => ToolKind::AddSource,
            "edit_note" => ToolKind::EditNote,
            "submit" => ToolKind::Submit,
            _ => ToolKind::Other,
        }
    }
}

/// The result of one tool invocation.
///
/// Which optional fields are set depends on the tool: `query` and
/// `search_results` for `search`, `source_id` and `note` for `add_source`,
/// `board_id` and `new_note` for `edit_note`, `probabilities` for `submit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub tool: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub error: bool,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub output_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchSource>>,
    #[serde(
        default,
        deserialize_with = "lenient::source_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::board_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub board_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f64>>,
}

impl Observation {
    pub fn tool_kind(&self) -> ToolKind {
        ToolKind::parse(&self.tool)
    }
}

/// The terminal event of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunEnd {
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub exit_status: String,
    /// Outcome label -> probability. Empty when the agent exited without submitting.
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub submission: BTreeMap<String, f64>,
    /// The agent's authoritative board at the end of the run
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub board: Vec<BoardEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Events delivered on a run's stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Run accepted by the agent, with its budget
    RunStart {
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        title: String,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        outcomes: String,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        step_limit: u32,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        cost_limit: f64,
    },
    /// A new reasoning/tool-invocation cycle began
    StepStart {
        step: u32,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        model_cost: f64,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        search_cost: f64,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        total_cost: f64,
    },
    /// The model answered; `actions` are the tool calls it requested
    ModelResponse {
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        content: String,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        thinking: String,
        #[serde(default, deserialize_with = "lenient::null_as_default")]
        actions: Vec<ActionInfo>,
    },
    /// A tool finished
    Observation(Observation),
    /// The run is over
    RunEnd(RunEnd),
}

impl AgentEvent {
    /// Decode one stream frame.
    ///
    /// Anything that is not a JSON object with a known `type` tag (keepalive
    /// pings, truncated frames, future event kinds) yields `None`.
    pub fn decode(frame: &str) -> Option<Self> {
        let frame = frame.trim();
        if frame.is_empty() {
            return None;
        }
        serde_json::from_str(frame).ok()
    }

    /// The wire tag of this event
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::RunStart { .. } => "run_start",
            AgentEvent::StepStart { .. } => "step_start",
            AgentEvent::ModelResponse { .. } => "model_response",
            AgentEvent::Observation(_) => "observation",
            AgentEvent::RunEnd(_) => "run_end",
        }
    }
}

// ============================================================================
// Backend boundary
// ============================================================================

/// Raw frames of one run's event stream, in arrival order
pub type FrameStream = BoxStream<'static, Result<String>>;

/// The remote forecasting backend.
///
/// Implemented over HTTP by the client crate, and by scripted fakes in tests.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Ask the planner to structure a prompt into a forecasting problem
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResponse>;

    /// Launch an agent run for a committed plan
    async fn create_run(&self, request: &RunRequest) -> Result<RunCreated>;

    /// Open the event stream of a launched run
    async fn open_stream(&self, run_id: &str) -> Result<FrameStream>;
}
