//! Result types for expansion runs.

use std::collections::HashMap;

use crate::stats::RunStats;
use crate::types::{ChildCodeRecord, ExpansionCandidate, ExpansionResult, FailureSummary};

/// Raw output of the orchestrator phase of a run.
///
/// `results` holds cached hits together with every result reported by a
/// worker. Candidates dispatched but never reported (after a stall abort)
/// have no entry.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionOutcome {
    /// Unique candidates in selection order.
    pub candidates: Vec<ExpansionCandidate>,
    /// Candidates dropped as known to have no descendants.
    pub skipped: Vec<ExpansionCandidate>,
    /// Results keyed by code.
    pub results: HashMap<String, ExpansionResult>,
    /// Pool size used for the run.
    pub worker_count: usize,
    /// Workers that reported back.
    pub completed_count: usize,
    /// Reported results that carry an error.
    pub failed_count: usize,
    /// Candidates answered from the cache.
    pub cached_count: usize,
    /// Whether the run was abandoned after a stall.
    pub aborted: bool,
    /// Run statistics.
    pub stats: RunStats,
}

impl ExpansionOutcome {
    /// Returns the result for `code`, if one was produced.
    pub fn result(&self, code: &str) -> Option<&ExpansionResult> {
        self.results.get(code)
    }

    /// Candidates that have no result because the run was abandoned.
    pub fn unreported(&self) -> impl Iterator<Item = &ExpansionCandidate> {
        self.candidates
            .iter()
            .filter(|candidate| !self.results.contains_key(&candidate.code))
    }

    /// Total number of descendants across successful results.
    pub fn total_children(&self) -> usize {
        self.results.values().map(ExpansionResult::child_count).sum()
    }
}

/// Overall status of a run, for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    /// Every candidate expanded successfully.
    Complete,
    /// The run finished but some codes failed.
    PartialFailure,
    /// The run was abandoned after a stall.
    Aborted,
}

/// Everything the presentation layer needs to render a run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionRunResult {
    /// Orchestrator output.
    pub outcome: ExpansionOutcome,
    /// Flattened child rows.
    pub records: Vec<ChildCodeRecord>,
    /// Codes that failed or were never reported.
    pub failures: Vec<FailureSummary>,
}

impl ExpansionRunResult {
    /// Workers that reported back.
    pub fn completed_count(&self) -> usize {
        self.outcome.completed_count
    }

    /// Reported results that carry an error.
    pub fn failed_count(&self) -> usize {
        self.outcome.failed_count
    }

    /// Whether the run was abandoned after a stall.
    pub fn aborted(&self) -> bool {
        self.outcome.aborted
    }

    /// Overall status of the run.
    pub fn status(&self) -> RunStatus {
        if self.outcome.aborted {
            RunStatus::Aborted
        } else if self.failures.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::PartialFailure
        }
    }
}
