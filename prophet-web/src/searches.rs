//! Search provenance: one group per search the agent ran, tagged with its step

use prophet_web_sdk::SearchSource;
use serde::{Deserialize, Serialize};

use crate::registry::SourceRegistry;

/// All results for one query issued during one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchGroup {
    pub step: u32,
    pub query: String,
    pub results: Vec<SearchSource>,
}

/// Accumulates search groups for the current run and feeds the source registry.
///
/// Groups are append-only and never merged, even when a query repeats.
#[derive(Debug, Clone, Default)]
pub struct SearchAggregator {
    groups: Vec<SearchGroup>,
    registry: SourceRegistry,
}

impl SearchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one search observation.
    ///
    /// With `register` set, every result is also upserted into the registry.
    /// Error-flagged searches are recorded without registering their results.
    pub fn record(
        &mut self,
        step: u32,
        query: String,
        results: Vec<SearchSource>,
        register: bool,
    ) -> &SearchGroup {
        if register {
            self.registry.extend(results.iter().cloned());
        }
        self.groups.push(SearchGroup {
            step,
            query,
            results,
        });
        let idx = self.groups.len() - 1;
        &self.groups[idx]
    }

    pub fn groups(&self) -> &[SearchGroup] {
        &self.groups
    }

    /// Groups produced during the given step, in arrival order
    pub fn groups_for_step(&self, step: u32) -> impl Iterator<Item = &SearchGroup> {
        self.groups.iter().filter(move |g| g.step == step)
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Drop all groups and registered sources (start of a new run)
    pub fn clear(&mut self) {
        self.groups.clear();
        self.registry.clear();
    }
}
