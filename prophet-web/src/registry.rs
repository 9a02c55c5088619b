//! Source registry: every search hit seen during the current run, by identifier
//!
//! `add_source` observations only carry a source identifier, so the title,
//! url and snippet have to come from the search results that preceded them.

use std::collections::HashMap;

use prophet_web_sdk::SearchSource;

/// Normalize a source identifier for lookup: trimmed and upper-cased.
///
/// `"ab1"`, `" AB1 "` and `"Ab1"` all map to `"AB1"`.
pub fn normalize_source_id(source_id: &str) -> String {
    source_id.trim().to_uppercase()
}

/// Last-seen search hit for each normalized identifier
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, SearchSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a search hit. A later hit with the same normalized id replaces the earlier one.
    pub fn insert(&mut self, source: SearchSource) {
        self.sources.insert(normalize_source_id(&source.id), source);
    }

    pub fn extend<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = SearchSource>,
    {
        for source in sources {
            self.insert(source);
        }
    }

    /// Find a hit by identifier, ignoring case and surrounding whitespace
    pub fn lookup(&self, source_id: &str) -> Option<&SearchSource> {
        self.sources.get(&normalize_source_id(source_id))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }
}
