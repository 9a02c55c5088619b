//! Final forecast summary shown for a finished run

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One outcome of the submitted forecast
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeProbability {
    pub outcome: String,
    pub probability: f64,
}

impl OutcomeProbability {
    /// Probability as a percentage with one decimal, e.g. `"42.5%"`
    pub fn percent(&self) -> String {
        format!("{:.1}%", self.probability * 100.0)
    }

    /// Badge text: outcome name followed by its percentage
    pub fn label(&self) -> String {
        format!("{} {}", self.outcome, self.percent())
    }
}

/// The submission of a finished run, ordered for display
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSummary {
    /// The agent exited without submitting a forecast
    NoSubmission { exit_status: String },
    /// Outcomes ordered by descending probability (ties by name)
    Forecast {
        exit_status: String,
        outcomes: Vec<OutcomeProbability>,
    },
}

impl ResultSummary {
    pub fn new(submission: &BTreeMap<String, f64>, exit_status: &str) -> Self {
        if submission.is_empty() {
            return ResultSummary::NoSubmission {
                exit_status: exit_status.to_string(),
            };
        }
        let mut outcomes: Vec<OutcomeProbability> = submission
            .iter()
            .map(|(outcome, probability)| OutcomeProbability {
                outcome: outcome.clone(),
                probability: *probability,
            })
            .collect();
        outcomes.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.outcome.cmp(&b.outcome))
        });
        ResultSummary::Forecast {
            exit_status: exit_status.to_string(),
            outcomes,
        }
    }

    pub fn exit_status(&self) -> &str {
        match self {
            ResultSummary::NoSubmission { exit_status } => exit_status,
            ResultSummary::Forecast { exit_status, .. } => exit_status,
        }
    }

    pub fn outcomes(&self) -> &[OutcomeProbability] {
        match self {
            ResultSummary::NoSubmission { .. } => &[],
            ResultSummary::Forecast { outcomes, .. } => outcomes,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, ResultSummary::Forecast { .. })
    }
}
