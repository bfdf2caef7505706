//! Reduction of raw expansion results into flattened, mapped child rows.

use std::collections::HashSet;

use crate::mapping::CodeMappingTable;
use crate::result::ExpansionOutcome;
use crate::types::{
    ChildCodeRecord, ExpansionCandidate, ExpansionResult, FailureSummary, SourceRef, ViewMode,
};

const UNREPORTED_ABORTED: &str = "no response before the run was abandoned";
const UNREPORTED: &str = "no result was produced";

/// Flattened rows and failure summary for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reduction {
    /// Child rows, grouped by parent in selection order.
    pub records: Vec<ChildCodeRecord>,
    /// Codes that failed or were never reported.
    pub failures: Vec<FailureSummary>,
}

impl Reduction {
    /// Rows whose child code has a local identifier.
    pub fn mapped_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.mapped_local_id.is_mapped())
            .count()
    }

    /// Rows whose child code has no local identifier.
    pub fn unmapped_count(&self) -> usize {
        self.records.len() - self.mapped_count()
    }

    /// Rows grouped by parent code, keeping row order.
    pub fn by_parent(&self) -> Vec<(&str, Vec<&ChildCodeRecord>)> {
        let mut groups: Vec<(&str, Vec<&ChildCodeRecord>)> = Vec::new();
        for record in &self.records {
            let starts_group = groups
                .last()
                .map_or(true, |(parent, _)| *parent != record.parent_code);
            if starts_group {
                groups.push((record.parent_code.as_str(), Vec::new()));
            }
            if let Some((_, rows)) = groups.last_mut() {
                rows.push(record);
            }
        }
        groups
    }
}

/// Joins expansion results against the code mapping table.
///
/// Reduction is pure: the same outcome and view mode always yield the same
/// rows, so the presentation layer can re-run it to switch views.
#[derive(Debug, Clone, Copy)]
pub struct ResultReducer<'a> {
    mapping: &'a CodeMappingTable,
}

impl<'a> ResultReducer<'a> {
    /// Creates a reducer over a mapping table.
    pub fn new(mapping: &'a CodeMappingTable) -> Self {
        Self { mapping }
    }

    /// Flattens `outcome` into child rows according to `mode`.
    pub fn reduce(&self, outcome: &ExpansionOutcome, mode: ViewMode) -> Reduction {
        let mut reduction = Reduction::default();

        for candidate in &outcome.candidates {
            match outcome.results.get(&candidate.code) {
                Some(result) if result.is_success() => {
                    self.push_records(&mut reduction.records, candidate, result, mode);
                }
                Some(result) => reduction.failures.push(FailureSummary {
                    code: candidate.code.clone(),
                    display_name: display_name(candidate, result),
                    error: result.error.clone().unwrap_or_default(),
                }),
                None => reduction.failures.push(FailureSummary {
                    code: candidate.code.clone(),
                    display_name: candidate.display_name.clone(),
                    error: if outcome.aborted {
                        UNREPORTED_ABORTED
                    } else {
                        UNREPORTED
                    }
                    .to_string(),
                }),
            }
        }

        reduction
    }

    fn push_records(
        &self,
        records: &mut Vec<ChildCodeRecord>,
        candidate: &ExpansionCandidate,
        result: &ExpansionResult,
        mode: ViewMode,
    ) {
        let parent_display = display_name(candidate, result).unwrap_or_default();
        let attributions: Vec<Vec<SourceRef>> = match (mode, candidate.sources.first()) {
            (_, None) => vec![Vec::new()],
            (ViewMode::Unique, Some(first)) => vec![vec![first.clone()]],
            (ViewMode::PerSource, Some(_)) => {
                candidate.sources.iter().map(|s| vec![s.clone()]).collect()
            }
        };

        let mut seen: HashSet<&str> = HashSet::new();
        for child in &result.children {
            if !seen.insert(child.code.as_str()) {
                continue;
            }
            let mapped_local_id = self.mapping.resolve(&child.code);
            for sources in &attributions {
                records.push(ChildCodeRecord {
                    parent_code: candidate.code.clone(),
                    parent_display: parent_display.clone(),
                    child_code: child.code.clone(),
                    child_display: child.display_name.clone(),
                    inactive: child.inactive,
                    mapped_local_id: mapped_local_id.clone(),
                    sources: sources.clone(),
                });
            }
        }
    }
}

fn display_name(candidate: &ExpansionCandidate, result: &ExpansionResult) -> Option<String> {
    if !result.display_name.is_empty() {
        Some(result.display_name.clone())
    } else {
        candidate.display_name.clone()
    }
}
