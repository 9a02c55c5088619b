//! Source board: the agent's curated evidence, kept sorted by board id
//!
//! The board is rebuilt speculatively while a run is streaming, from
//! `add_source` and `edit_note` observations. Board ids are never invented
//! client-side: they come from a structured field or from a `#<digits>` token
//! in the tool's output text. The snapshot carried by `run_end` replaces
//! whatever was built incrementally.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use prophet_web_sdk::{BoardEntry, BoardSource, Observation};
use regex::Regex;

use crate::registry::SourceRegistry;

fn board_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#([0-9]+)").expect("board id pattern is valid"))
}

/// Extract the first `#<digits>` board id embedded in free text.
///
/// Returns `None` when there is no such token, or when it is zero or does not
/// fit an `i64`.
pub fn extract_board_id(text: &str) -> Option<i64> {
    let digits = board_id_pattern().captures(text)?.get(1)?.as_str();
    digits.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Work out which board id an `add_source` observation was assigned.
///
/// A positive structured `board_id` wins; otherwise the id embedded in the
/// output text is used.
pub fn resolve_board_id(observation: &Observation) -> Option<i64> {
    observation
        .board_id
        .filter(|id| *id > 0)
        .or_else(|| extract_board_id(&observation.output_text))
}

/// Result of applying an `add_source` observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The board id the observation resolved to, if any
    pub board_id: Option<i64>,
    /// Whether the board was mutated
    pub placed: bool,
}

/// The canonical board for the current run
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    entries: Vec<BoardEntry>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries sorted strictly ascending by id
    pub fn entries(&self) -> &[BoardEntry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&BoardEntry> {
        self.position(id).ok().map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, id: i64) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |e| e.id)
    }

    /// Insert an entry, replacing any entry with the same id. Order is preserved.
    pub fn upsert(&mut self, entry: BoardEntry) {
        match self.position(entry.id) {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    /// Apply an `add_source` observation.
    ///
    /// The board is left untouched when the observation is error-flagged,
    /// when no board id can be resolved, or when the source is not in the
    /// registry (an entry needs the title, url and snippet only the registry
    /// has).
    pub fn apply_add_source(
        &mut self,
        observation: &Observation,
        registry: &SourceRegistry,
    ) -> Placement {
        let board_id = resolve_board_id(observation);
        let unplaced = Placement {
            board_id,
            placed: false,
        };

        if observation.error {
            tracing::debug!(tool = %observation.tool, "add_source reported an error; board unchanged");
            return unplaced;
        }
        let Some(id) = board_id else {
            tracing::debug!("add_source did not reveal a board id; board unchanged");
            return unplaced;
        };
        let source_id = observation.source_id.as_deref().unwrap_or_default();
        let Some(source) = registry.lookup(source_id) else {
            tracing::debug!(board_id = id, source_id = %source_id, "source not in registry; board unchanged");
            return unplaced;
        };

        self.upsert(BoardEntry {
            id,
            source: BoardSource::from(source),
            note: observation.note.clone().unwrap_or_default(),
            reaction: BTreeMap::new(),
        });
        Placement {
            board_id,
            placed: true,
        }
    }

    /// Apply an `edit_note` observation. Only the note changes; source and
    /// reaction are kept.
    ///
    /// An empty or missing `new_note` keeps the current note. Returns whether
    /// the board was mutated.
    pub fn apply_edit_note(&mut self, observation: &Observation) -> bool {
        if observation.error {
            return false;
        }
        let Some(id) = observation.board_id else {
            return false;
        };
        let Ok(idx) = self.position(id) else {
            tracing::debug!(board_id = id, "edit_note refers to an unknown board entry");
            return false;
        };
        if let Some(note) = observation.new_note.as_deref().filter(|n| !n.is_empty()) {
            self.entries[idx].note = note.to_string();
        }
        true
    }

    /// Replace the whole board with the agent's final snapshot.
    ///
    /// An empty snapshot leaves the incrementally built board in place.
    /// Returns whether the board was replaced.
    pub fn replace_with_snapshot(&mut self, snapshot: &[BoardEntry]) -> bool {
        if snapshot.is_empty() {
            return false;
        }
        let mut entries = snapshot.to_vec();
        entries.sort_by_key(|e| e.id);
        self.entries = entries;
        true
    }
}
