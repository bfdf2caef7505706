//! Configuration types for the expansion orchestrator and cache.

use std::time::Duration;

use crate::error::{ExpandResult, ExpansionError};

/// Default worker tiers: `(max uncached candidates, workers)`.
const DEFAULT_TIERS: [(usize, usize); 3] = [(100, 8), (300, 12), (500, 16)];

/// Worker count used above the last tier.
const DEFAULT_MAX_WORKERS: usize = 20;

/// Adaptive worker-pool sizing policy.
///
/// The pool size is picked once per run from the number of uncached
/// candidates. Each tier is an inclusive upper bound on the workload; anything
/// above the last tier gets `max_workers`. The result is always capped at the
/// workload size.
///
/// # Example
///
/// ```rust
/// use snomed_expand::WorkerSizing;
///
/// let sizing = WorkerSizing::default();
/// assert_eq!(sizing.worker_count(10), 8);
/// assert_eq!(sizing.worker_count(150), 12);
/// assert_eq!(sizing.worker_count(400), 16);
/// assert_eq!(sizing.worker_count(900), 20);
/// assert_eq!(sizing.worker_count(3), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSizing {
    /// Ascending `(upper bound inclusive, workers)` tiers.
    pub tiers: Vec<(usize, usize)>,
    /// Workers used when the workload exceeds every tier.
    pub max_workers: usize,
}

impl Default for WorkerSizing {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS.to_vec(),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl WorkerSizing {
    /// A fixed pool size regardless of workload (still capped at the workload).
    pub fn fixed(workers: usize) -> Self {
        Self {
            tiers: Vec::new(),
            max_workers: workers,
        }
    }

    /// Returns the number of workers to launch for `uncached` candidates.
    pub fn worker_count(&self, uncached: usize) -> usize {
        let tiered = self
            .tiers
            .iter()
            .find(|(bound, _)| uncached <= *bound)
            .map(|(_, workers)| *workers)
            .unwrap_or(self.max_workers);
        tiered.min(uncached)
    }

    fn validate(&self) -> ExpandResult<()> {
        if self.max_workers == 0 || self.tiers.iter().any(|(_, w)| *w == 0) {
            return Err(ExpansionError::InvalidConfig(
                "worker tiers must allow at least one worker".to_string(),
            ));
        }
        if self.tiers.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(ExpansionError::InvalidConfig(
                "worker tiers must be strictly ascending".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the expansion orchestrator.
///
/// # Example
///
/// ```rust
/// use snomed_expand::{OrchestratorConfig, WorkerSizing};
/// use std::time::Duration;
///
/// let config = OrchestratorConfig::builder()
///     .with_sizing(WorkerSizing::fixed(4))
///     .with_poll_interval(Duration::from_millis(50))
///     .with_max_idle_polls(40)
///     .with_join_window(Duration::from_millis(200))
///     .build();
///
/// assert_eq!(config.stall_timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pool sizing policy.
    pub sizing: WorkerSizing,
    /// How long the aggregating loop waits for a completion per poll.
    pub poll_interval: Duration,
    /// Consecutive empty polls tolerated before the run is aborted.
    pub max_idle_polls: u32,
    /// Best-effort wait for outstanding workers after the loop ends.
    pub join_window: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sizing: WorkerSizing::default(),
            poll_interval: Duration::from_millis(100),
            max_idle_polls: 100,
            join_window: Duration::from_millis(500),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a new builder for OrchestratorConfig.
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Time without any completion after which a run is treated as stalled.
    pub fn stall_timeout(&self) -> Duration {
        self.poll_interval * self.max_idle_polls
    }

    /// Checks that the configuration can drive a run.
    pub fn validate(&self) -> ExpandResult<()> {
        if self.poll_interval.is_zero() {
            return Err(ExpansionError::InvalidConfig(
                "poll interval must be non-zero".to_string(),
            ));
        }
        self.sizing.validate()
    }
}

/// Builder for OrchestratorConfig.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// Sets the worker sizing policy.
    pub fn with_sizing(mut self, sizing: WorkerSizing) -> Self {
        self.config.sizing = sizing;
        self
    }

    /// Sets the completion poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Sets the idle poll ceiling.
    pub fn with_max_idle_polls(mut self, max_idle_polls: u32) -> Self {
        self.config.max_idle_polls = max_idle_polls;
        self
    }

    /// Sets the join window for outstanding workers.
    pub fn with_join_window(mut self, join_window: Duration) -> Self {
        self.config.join_window = join_window;
        self
    }

    /// Builds the OrchestratorConfig.
    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

/// Configuration for the expansion cache.
///
/// # Example
///
/// ```rust
/// use snomed_expand::CacheConfig;
/// use std::time::Duration;
///
/// let cache = CacheConfig {
///     max_entries: 5_000,
///     ttl: Some(Duration::from_secs(3600)),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached expansions.
    pub max_entries: usize,
    /// Time-to-live for entries (None = keep for the lifetime of the cache).
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: None,
        }
    }
}
