//! Statistics for a single expansion run.

use std::time::Duration;

/// Counters and timing for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    /// Unique candidates after deduplication and filtering.
    pub unique_candidates: usize,
    /// Candidates served from the cache.
    pub cached: usize,
    /// Candidates dropped as known to have no descendants.
    pub skipped: usize,
    /// Candidates sent to workers.
    pub dispatched: usize,
    /// Workers that reported back.
    pub completed: usize,
    /// Reported expansions that failed.
    pub failed: usize,
    /// Pool size chosen for the run.
    pub worker_count: usize,
    /// Longest run of consecutive empty polls.
    pub longest_idle_streak: u32,
    /// Wall-clock time spent in the orchestrator.
    pub duration: Duration,
    /// Whether the run was abandoned after a stall.
    pub aborted: bool,
}

impl RunStats {
    /// Candidates dispatched but never reported.
    pub fn unreported(&self) -> usize {
        self.dispatched.saturating_sub(self.completed)
    }

    /// Share of unique candidates answered from the cache, as a percentage.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.unique_candidates == 0 {
            0.0
        } else {
            (self.cached as f64 / self.unique_candidates as f64) * 100.0
        }
    }

    /// Share of completed calls that succeeded, as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            ((self.completed - self.failed) as f64 / self.completed as f64) * 100.0
        }
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Expansion Run Statistics:")?;
        writeln!(f, "  Candidates:      {}", self.unique_candidates)?;
        writeln!(f, "  From cache:      {}", self.cached)?;
        writeln!(f, "  Skipped:         {}", self.skipped)?;
        writeln!(f, "  Dispatched:      {}", self.dispatched)?;
        writeln!(f, "  Completed:       {}", self.completed)?;
        writeln!(f, "  Failed:          {}", self.failed)?;
        writeln!(f, "  Workers:         {}", self.worker_count)?;
        writeln!(f, "  Success rate:    {:.1}%", self.success_rate())?;
        writeln!(f, "  Duration:        {:.1}ms", self.duration.as_secs_f64() * 1000.0)?;
        if self.aborted {
            writeln!(f, "  Aborted:         yes ({} unreported)", self.unreported())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = RunStats {
            unique_candidates: 10,
            cached: 4,
            dispatched: 6,
            completed: 6,
            failed: 3,
            ..RunStats::default()
        };
        assert!((stats.cache_hit_rate() - 40.0).abs() < 0.01);
        assert!((stats.success_rate() - 50.0).abs() < 0.01);
        assert_eq!(stats.unreported(), 0);
    }

    #[test]
    fn test_empty_rates() {
        let stats = RunStats::default();
        assert!((stats.cache_hit_rate() - 0.0).abs() < 0.01);
        assert!((stats.success_rate() - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_display_mentions_abort() {
        let stats = RunStats {
            dispatched: 5,
            completed: 2,
            aborted: true,
            ..RunStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("Expansion Run Statistics"));
        assert!(text.contains("Aborted:         yes (3 unreported)"));

        assert!(!RunStats::default().to_string().contains("Aborted"));
    }
}
