//! Candidate selection: deduplication, filtering and cache partitioning.

use std::collections::HashMap;

use crate::cache::ExpansionCache;
use crate::types::{ExpansionCandidate, ExpansionResult, RunOptions};

/// The work-list produced for one run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Every surviving candidate, unique by code, in first-seen order.
    pub candidates: Vec<ExpansionCandidate>,
    /// Results served from the cache, keyed by code.
    pub cached_hits: HashMap<String, ExpansionResult>,
    /// Candidates that must be dispatched, in first-seen order.
    pub uncached: Vec<ExpansionCandidate>,
    /// Candidates dropped because they are known to have no descendants.
    pub skipped: Vec<ExpansionCandidate>,
}

impl Selection {
    /// Number of unique candidates that survived filtering.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Merges raw entries into one candidate per unique code.
///
/// First-seen order is kept. Sources of duplicates are appended (exact
/// duplicates collapsed), the include-inactive flag is widened to
/// `include_inactive || any entry's flag`, the first display name wins and the
/// last known descendant count wins.
pub fn merge_candidates(
    entries: impl IntoIterator<Item = ExpansionCandidate>,
    include_inactive: bool,
) -> Vec<ExpansionCandidate> {
    let mut merged: Vec<ExpansionCandidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let code = entry.code.trim().to_string();
        if code.is_empty() {
            continue;
        }

        match index.get(&code) {
            Some(&position) => {
                let existing = &mut merged[position];
                existing.include_inactive |= entry.include_inactive;
                if existing.display_name.is_none() {
                    existing.display_name = entry.display_name.filter(|n| !n.trim().is_empty());
                }
                if entry.descendant_count.is_some() {
                    existing.descendant_count = entry.descendant_count;
                }
                for source in entry.sources {
                    if !existing.sources.contains(&source) {
                        existing.sources.push(source);
                    }
                }
            }
            None => {
                let mut candidate = entry;
                candidate.code = code.clone();
                candidate.include_inactive |= include_inactive;
                candidate.display_name = candidate.display_name.filter(|n| !n.trim().is_empty());
                let mut sources = Vec::with_capacity(candidate.sources.len());
                for source in candidate.sources.drain(..) {
                    if !sources.contains(&source) {
                        sources.push(source);
                    }
                }
                candidate.sources = sources;
                index.insert(code, merged.len());
                merged.push(candidate);
            }
        }
    }

    merged
}

/// Builds the work-list for a run.
///
/// Every surviving code ends up in exactly one of `cached_hits` or `uncached`.
/// The cache is consulted only when `options.use_cache` is set.
pub fn select_candidates(
    entries: impl IntoIterator<Item = ExpansionCandidate>,
    options: &RunOptions,
    cache: &mut ExpansionCache,
) -> Selection {
    let mut selection = Selection::default();

    for candidate in merge_candidates(entries, options.include_inactive) {
        if options.skip_zero_descendants && candidate.descendant_count == Some(0) {
            tracing::debug!(code = %candidate.code, "skipping candidate with no known descendants");
            selection.skipped.push(candidate);
            continue;
        }

        let hit = if options.use_cache {
            cache.get(&candidate.code, candidate.include_inactive)
        } else {
            None
        };

        match hit {
            Some(result) => {
                selection.cached_hits.insert(candidate.code.clone(), result);
            }
            None => selection.uncached.push(candidate.clone()),
        }
        selection.candidates.push(candidate);
    }

    tracing::debug!(
        unique = selection.candidates.len(),
        cached = selection.cached_hits.len(),
        uncached = selection.uncached.len(),
        skipped = selection.skipped.len(),
        "candidates selected"
    );

    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChildConcept, SourceRef};

    fn source(id: &str) -> SourceRef {
        SourceRef::new(id, format!("Search {id}"), "Folder")
    }

    fn candidate(code: &str, src: &str) -> ExpansionCandidate {
        ExpansionCandidate::new(code, false, source(src))
    }

    #[test]
    fn test_merge_duplicates() {
        let merged = merge_candidates(
            vec![
                candidate("73211009", "A"),
                candidate("38341003", "A"),
                candidate("73211009", "B"),
            ],
            false,
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].code, "73211009");
        assert_eq!(merged[0].sources, vec![source("A"), source("B")]);
        assert_eq!(merged[1].code, "38341003");
    }

    #[test]
    fn test_merge_collapses_identical_sources() {
        let merged = merge_candidates(
            vec![candidate("100", "A"), candidate("100", "A")],
            false,
        );
        assert_eq!(merged[0].sources, vec![source("A")]);
    }

    #[test]
    fn test_merge_trims_codes_and_drops_blank() {
        let merged = merge_candidates(
            vec![candidate(" 100 ", "A"), candidate("100", "B"), candidate("  ", "C")],
            false,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].code, "100");
        assert_eq!(merged[0].sources.len(), 2);
    }

    #[test]
    fn test_merge_widens_include_inactive() {
        let mut second = candidate("100", "B");
        second.include_inactive = true;
        let merged = merge_candidates(vec![candidate("100", "A"), second], false);
        assert!(merged[0].include_inactive);

        let merged = merge_candidates(vec![candidate("200", "A")], true);
        assert!(merged[0].include_inactive);
    }

    #[test]
    fn test_merge_metadata() {
        let first = candidate("100", "A").with_descendant_count(5);
        let second = candidate("100", "B")
            .with_display_name("Asthma")
            .with_descendant_count(0);
        let merged = merge_candidates(vec![first, second], false);

        assert_eq!(merged[0].display_name.as_deref(), Some("Asthma"));
        assert_eq!(merged[0].descendant_count, Some(0));
    }

    #[test]
    fn test_skip_zero_descendants() {
        let mut cache = ExpansionCache::default();
        let options = RunOptions {
            skip_zero_descendants: true,
            ..RunOptions::default()
        };
        let selection = select_candidates(
            vec![
                candidate("100", "A").with_descendant_count(0),
                candidate("200", "A").with_descendant_count(3),
                candidate("300", "A"),
            ],
            &options,
            &mut cache,
        );

        assert_eq!(selection.skipped.len(), 1);
        assert_eq!(selection.skipped[0].code, "100");
        let codes: Vec<&str> = selection.uncached.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["200", "300"]);
    }

    #[test]
    fn test_zero_descendants_kept_without_flag() {
        let mut cache = ExpansionCache::default();
        let selection = select_candidates(
            vec![candidate("100", "A").with_descendant_count(0)],
            &RunOptions::default(),
            &mut cache,
        );
        assert!(selection.skipped.is_empty());
        assert_eq!(selection.uncached.len(), 1);
    }

    #[test]
    fn test_cache_partition() {
        let mut cache = ExpansionCache::default();
        cache.insert(
            false,
            ExpansionResult::success("100", "Cached", vec![ChildConcept::new("101", "Child")]),
        );

        let selection = select_candidates(
            vec![candidate("100", "A"), candidate("200", "A")],
            &RunOptions::default(),
            &mut cache,
        );

        assert_eq!(selection.len(), 2);
        assert!(selection.cached_hits.contains_key("100"));
        assert_eq!(selection.uncached.len(), 1);
        assert_eq!(selection.uncached[0].code, "200");
    }

    #[test]
    fn test_cache_ignored_when_disabled() {
        let mut cache = ExpansionCache::default();
        cache.insert(false, ExpansionResult::success("100", "Cached", Vec::new()));

        let options = RunOptions {
            use_cache: false,
            ..RunOptions::default()
        };
        let selection = select_candidates(vec![candidate("100", "A")], &options, &mut cache);

        assert!(selection.cached_hits.is_empty());
        assert_eq!(selection.uncached.len(), 1);
    }

    #[test]
    fn test_cache_respects_inactive_flag() {
        let mut cache = ExpansionCache::default();
        cache.insert(false, ExpansionResult::success("100", "Cached", Vec::new()));

        let options = RunOptions {
            include_inactive: true,
            ..RunOptions::default()
        };
        let selection = select_candidates(vec![candidate("100", "A")], &options, &mut cache);

        assert!(selection.cached_hits.is_empty());
        assert_eq!(selection.uncached.len(), 1);
    }

    #[test]
    fn test_every_code_in_exactly_one_partition() {
        let mut cache = ExpansionCache::default();
        for code in ["2", "4", "6"] {
            cache.insert(false, ExpansionResult::success(code, "c", Vec::new()));
        }
        let entries: Vec<_> = (1..=8)
            .flat_map(|i| vec![candidate(&i.to_string(), "A"), candidate(&i.to_string(), "B")])
            .collect();

        let selection = select_candidates(entries, &RunOptions::default(), &mut cache);

        assert_eq!(selection.len(), 8);
        for c in &selection.candidates {
            let cached = selection.cached_hits.contains_key(&c.code);
            let queued = selection.uncached.iter().any(|u| u.code == c.code);
            assert!(cached ^ queued, "code {} must be in exactly one set", c.code);
        }
    }
}
