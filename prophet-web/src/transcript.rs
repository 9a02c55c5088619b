//! Transcript: the append-only conversation shown to the user

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use prophet_web_sdk::{BoardEntry, SearchSource};
use serde::{Deserialize, Serialize};

/// What a transcript message shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// A prompt typed by the user
    User { content: String },
    /// A forecasting problem proposed by the planner, awaiting commitment
    Plan { title: String, outcomes: Vec<String> },
    /// Marks the start of the agent's turn
    Divider,
    /// Free-text reasoning with no tool call attached
    Think {
        step: u32,
        content: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        thinking: String,
    },
    /// A search the agent ran, with its full result list for later expansion
    Search {
        step: u32,
        query: String,
        count: usize,
        results: Vec<SearchSource>,
    },
    /// The agent put a source on the board
    AddSource {
        step: u32,
        source_id: String,
        note: String,
        board_id: Option<i64>,
    },
    /// The agent revised a board note
    EditNote {
        step: u32,
        board_id: i64,
        new_note: String,
    },
    /// The run finished; `submission` is empty when the agent never submitted
    Result {
        submission: BTreeMap<String, f64>,
        exit_status: String,
        board: Vec<BoardEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Planning or launching failed
    Error { content: String },
}

impl MessageKind {
    /// The wire tag of this kind
    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::User { .. } => "user",
            MessageKind::Plan { .. } => "plan",
            MessageKind::Divider => "divider",
            MessageKind::Think { .. } => "think",
            MessageKind::Search { .. } => "search",
            MessageKind::AddSource { .. } => "add_source",
            MessageKind::EditNote { .. } => "edit_note",
            MessageKind::Result { .. } => "result",
            MessageKind::Error { .. } => "error",
        }
    }

    /// The step a step-scoped message belongs to
    pub fn step(&self) -> Option<u32> {
        match self {
            MessageKind::Think { step, .. }
            | MessageKind::Search { step, .. }
            | MessageKind::AddSource { step, .. }
            | MessageKind::EditNote { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// One transcript item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Strictly increasing within a session, never reused
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: MessageKind,
}

impl ChatMessage {
    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error { .. })
    }
}

/// Append-only message list with its id allocator
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with a fresh id and the current time
    pub fn push(&mut self, kind: MessageKind) -> &ChatMessage {
        let message = ChatMessage {
            id: self.next_id,
            timestamp: Utc::now(),
            kind,
        };
        self.next_id += 1;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
