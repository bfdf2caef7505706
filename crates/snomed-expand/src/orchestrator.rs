//! Worker pool orchestrator.
//!
//! Expands uncached candidates with a bounded pool of worker threads. Workers
//! only make the remote call; every write to shared state (results, counters,
//! cache, progress callbacks) happens on the calling thread, which consumes a
//! single completion queue.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::cache::ExpansionCache;
use crate::cancel::CancellationToken;
use crate::config::OrchestratorConfig;
use crate::error::{ClientError, ExpandResult};
use crate::mapping::CodeMappingTable;
use crate::reducer::ResultReducer;
use crate::result::{ExpansionOutcome, ExpansionRunResult};
use crate::selector::{select_candidates, Selection};
use crate::stats::RunStats;
use crate::traits::{ExpansionClient, NoProgress, ProgressReporter};
use crate::types::{ExpansionCandidate, ExpansionResult, RunOptions};
use crate::worker::{spawn_worker, Completion, Task};

/// How often outstanding workers are checked during the join window.
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Main entry point for expansion runs.
///
/// # Example
///
/// ```ignore
/// use snomed_expand::{ExpansionCache, ExpansionOrchestrator, RunOptions};
/// use std::sync::Arc;
///
/// let orchestrator = ExpansionOrchestrator::new(Arc::new(my_client));
/// let mut cache = ExpansionCache::default();
///
/// let run = orchestrator.run_expansion(candidates, &RunOptions::default(), &mut cache, &mapping)?;
/// println!("{} rows, {} failures", run.records.len(), run.failures.len());
/// ```
pub struct ExpansionOrchestrator {
    client: Arc<dyn ExpansionClient>,
    config: OrchestratorConfig,
}

impl ExpansionOrchestrator {
    /// Creates an orchestrator with default configuration.
    pub fn new(client: Arc<dyn ExpansionClient>) -> Self {
        Self::with_config(client, OrchestratorConfig::default())
    }

    /// Creates an orchestrator with custom configuration.
    pub fn with_config(client: Arc<dyn ExpansionClient>, config: OrchestratorConfig) -> Self {
        Self { client, config }
    }

    /// Returns the orchestrator configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs a full expansion: selection, dispatch, aggregation and reduction.
    ///
    /// Blocks until every dispatched candidate has reported or the run stalls.
    /// Only setup problems are returned as errors; per-code failures are listed
    /// in [`ExpansionRunResult::failures`].
    pub fn run_expansion(
        &self,
        candidates: Vec<ExpansionCandidate>,
        options: &RunOptions,
        cache: &mut ExpansionCache,
        mapping: &CodeMappingTable,
    ) -> ExpandResult<ExpansionRunResult> {
        self.run_expansion_with_progress(candidates, options, cache, mapping, &mut NoProgress)
    }

    /// Like [`run_expansion`](Self::run_expansion), reporting progress after
    /// every completion.
    pub fn run_expansion_with_progress(
        &self,
        candidates: Vec<ExpansionCandidate>,
        options: &RunOptions,
        cache: &mut ExpansionCache,
        mapping: &CodeMappingTable,
        progress: &mut dyn ProgressReporter,
    ) -> ExpandResult<ExpansionRunResult> {
        self.config.validate()?;

        let selection = select_candidates(candidates, options, cache);
        let outcome = self.expand_selection(selection, cache, progress)?;
        let reduction = ResultReducer::new(mapping).reduce(&outcome, options.view_mode);

        Ok(ExpansionRunResult {
            outcome,
            records: reduction.records,
            failures: reduction.failures,
        })
    }

    /// Dispatches the uncached part of `selection` and aggregates the results.
    ///
    /// Fresh successes are written to `cache`; failures never are.
    pub fn expand_selection(
        &self,
        selection: Selection,
        cache: &mut ExpansionCache,
        progress: &mut dyn ProgressReporter,
    ) -> ExpandResult<ExpansionOutcome> {
        self.config.validate()?;
        let started = Instant::now();

        let Selection {
            candidates,
            cached_hits,
            uncached,
            skipped,
        } = selection;

        let total = uncached.len();
        let worker_count = self.config.sizing.worker_count(total);
        let cached_count = cached_hits.len();

        let mut stats = RunStats {
            unique_candidates: candidates.len(),
            cached: cached_count,
            skipped: skipped.len(),
            dispatched: total,
            worker_count,
            ..RunStats::default()
        };

        let mut results = cached_hits;
        let mut aborted = false;

        if total > 0 {
            self.client.prepare()?;
            tracing::info!(
                candidates = candidates.len(),
                cached = cached_count,
                uncached = total,
                workers = worker_count,
                "starting expansion run"
            );

            let pool = WorkerPool::new(Arc::clone(&self.client), &self.config, worker_count);
            let summary = pool.run(uncached, cache, progress, &mut results);
            stats.completed = summary.completed;
            stats.failed = summary.failed;
            stats.longest_idle_streak = summary.longest_idle_streak;
            aborted = summary.aborted;
        }

        stats.duration = started.elapsed();
        stats.aborted = aborted;

        tracing::info!(
            completed = stats.completed,
            failed = stats.failed,
            cached = stats.cached,
            aborted,
            duration_ms = stats.duration.as_millis() as u64,
            "expansion run finished"
        );

        Ok(ExpansionOutcome {
            candidates,
            skipped,
            results,
            worker_count,
            completed_count: stats.completed,
            failed_count: stats.failed,
            cached_count,
            aborted,
            stats,
        })
    }
}

impl std::fmt::Debug for ExpansionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Counters produced by one pool run.
#[derive(Debug, Default)]
struct PoolSummary {
    completed: usize,
    failed: usize,
    longest_idle_streak: u32,
    aborted: bool,
}

/// A worker slot with its dispatched task.
struct Active {
    task: Task,
    handle: Option<JoinHandle<()>>,
}

/// Per-run pool state, owned by the aggregating thread.
struct WorkerPool<'c> {
    client: Arc<dyn ExpansionClient>,
    config: &'c OrchestratorConfig,
    worker_count: usize,
    cancel: CancellationToken,
    completions: Sender<Completion>,
    receiver: mpsc::Receiver<Completion>,
    active: HashMap<usize, Active>,
    finished: Vec<JoinHandle<()>>,
    spawn_failures: VecDeque<Completion>,
}

impl<'c> WorkerPool<'c> {
    fn new(
        client: Arc<dyn ExpansionClient>,
        config: &'c OrchestratorConfig,
        worker_count: usize,
    ) -> Self {
        let (completions, receiver) = mpsc::channel();
        Self {
            client,
            config,
            worker_count,
            cancel: CancellationToken::new(),
            completions,
            receiver,
            active: HashMap::with_capacity(worker_count),
            finished: Vec::new(),
            spawn_failures: VecDeque::new(),
        }
    }

    fn run(
        mut self,
        uncached: Vec<ExpansionCandidate>,
        cache: &mut ExpansionCache,
        progress: &mut dyn ProgressReporter,
        results: &mut HashMap<String, ExpansionResult>,
    ) -> PoolSummary {
        let total = uncached.len();
        let mut pending: VecDeque<ExpansionCandidate> = uncached.into();
        let mut summary = PoolSummary::default();
        let mut idle_polls: u32 = 0;

        for slot in 0..self.worker_count {
            match pending.pop_front() {
                Some(candidate) => self.dispatch(slot, candidate),
                None => break,
            }
        }

        while summary.completed < total {
            let completion = match self.next_completion() {
                Ok(completion) => completion,
                Err(RecvTimeoutError::Timeout) => {
                    idle_polls += 1;
                    summary.longest_idle_streak = summary.longest_idle_streak.max(idle_polls);
                    if idle_polls > self.config.max_idle_polls {
                        tracing::warn!(
                            completed = summary.completed,
                            total,
                            in_flight = self.active.len(),
                            stalled_for_ms = self.config.stall_timeout().as_millis() as u64,
                            "no expansion progress, abandoning run"
                        );
                        summary.aborted = true;
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    summary.aborted = true;
                    break;
                }
            };

            idle_polls = 0;
            summary.completed += 1;

            let Completion {
                slot,
                candidate,
                result,
            } = completion;
            self.retire(slot, &result);

            // Refill before touching the cache so the pool stays saturated.
            if let Some(next) = pending.pop_front() {
                self.dispatch(slot, next);
            }

            if result.is_success() {
                tracing::debug!(
                    code = %candidate.code,
                    children = result.children.len(),
                    "expansion completed"
                );
                cache.insert(candidate.include_inactive, result.clone());
            } else {
                summary.failed += 1;
                tracing::warn!(
                    code = %candidate.code,
                    error = result.error.as_deref().unwrap_or_default(),
                    "expansion failed"
                );
            }
            results.insert(candidate.code, result);

            progress.report_progress(summary.completed, total);
        }

        self.shutdown();
        summary
    }

    fn next_completion(&mut self) -> Result<Completion, RecvTimeoutError> {
        match self.spawn_failures.pop_front() {
            Some(completion) => Ok(completion),
            None => self.receiver.recv_timeout(self.config.poll_interval),
        }
    }

    fn dispatch(&mut self, slot: usize, candidate: ExpansionCandidate) {
        let mut task = Task::queued(slot, candidate);
        tracing::debug!(slot, code = %task.candidate.code, "dispatching expansion");

        match spawn_worker(
            &mut task,
            Arc::clone(&self.client),
            self.cancel.clone(),
            self.completions.clone(),
        ) {
            Ok(handle) => {
                self.active.insert(
                    slot,
                    Active {
                        task,
                        handle: Some(handle),
                    },
                );
            }
            Err(err) => {
                tracing::warn!(
                    slot,
                    code = %task.candidate.code,
                    error = %err,
                    "failed to spawn worker"
                );
                let error = ClientError::Worker(format!("failed to spawn worker: {err}"));
                let result = ExpansionResult::failure(&task.candidate.code, error.to_string());
                self.spawn_failures.push_back(Completion {
                    slot,
                    candidate: task.candidate,
                    result,
                });
            }
        }
    }

    fn retire(&mut self, slot: usize, result: &ExpansionResult) {
        if let Some(mut active) = self.active.remove(&slot) {
            active.task.complete(result);
            tracing::trace!(slot, state = ?active.task.state, "worker slot freed");
            if let Some(handle) = active.handle.take() {
                self.finished.push(handle);
            }
        }
    }

    /// Cancels outstanding workers and joins them within the join window.
    ///
    /// Workers still running when the window closes are detached; their
    /// results are discarded because the token is already cancelled.
    fn shutdown(mut self) {
        self.cancel.cancel();

        let mut outstanding: Vec<JoinHandle<()>> = self.finished.drain(..).collect();
        outstanding.extend(self.active.drain().filter_map(|(_, active)| active.handle));

        let deadline = Instant::now() + self.config.join_window;
        loop {
            let (done, running): (Vec<_>, Vec<_>) =
                outstanding.into_iter().partition(|handle| handle.is_finished());
            for handle in done {
                // A panicking worker already had its call converted into a result.
                let _ = handle.join();
            }
            outstanding = running;

            if outstanding.is_empty() || Instant::now() >= deadline {
                break;
            }
            thread::sleep(JOIN_POLL);
        }

        if !outstanding.is_empty() {
            tracing::debug!(
                abandoned = outstanding.len(),
                "detaching workers still running after join window"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerSizing;
    use crate::types::{ChildConcept, SourceRef};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClient {
        calls: AtomicUsize,
    }

    impl CountingClient {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ExpansionClient for CountingClient {
        fn expand(
            &self,
            code: &str,
            _include_inactive: bool,
            _cancel: &CancellationToken,
        ) -> Result<ExpansionResult, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if code.starts_with("bad") {
                return Err(ClientError::NotFound(code.to_string()));
            }
            Ok(ExpansionResult::success(
                code,
                format!("Concept {code}"),
                vec![ChildConcept::new(format!("{code}-1"), "child")],
            ))
        }
    }

    struct RefusingClient;

    impl ExpansionClient for RefusingClient {
        fn prepare(&self) -> Result<(), ClientError> {
            Err(ClientError::Auth("no credentials configured".to_string()))
        }

        fn expand(
            &self,
            _code: &str,
            _include_inactive: bool,
            _cancel: &CancellationToken,
        ) -> Result<ExpansionResult, ClientError> {
            unreachable!("prepare failed")
        }
    }

    fn candidates(codes: &[&str]) -> Vec<ExpansionCandidate> {
        codes
            .iter()
            .map(|code| ExpansionCandidate::new(*code, false, SourceRef::new("s", "S", "F")))
            .collect()
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig::builder()
            .with_poll_interval(Duration::from_millis(10))
            .with_max_idle_polls(200)
            .build()
    }

    #[test]
    fn test_run_expands_all() {
        let client = CountingClient::new();
        let orchestrator = ExpansionOrchestrator::with_config(client.clone(), fast_config());
        let mut cache = ExpansionCache::default();

        let run = orchestrator
            .run_expansion(
                candidates(&["1", "2", "3"]),
                &RunOptions::default(),
                &mut cache,
                &CodeMappingTable::new(),
            )
            .unwrap();

        assert_eq!(run.completed_count(), 3);
        assert_eq!(run.failed_count(), 0);
        assert!(!run.aborted());
        assert_eq!(run.records.len(), 3);
        assert_eq!(run.outcome.worker_count, 3);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let client = CountingClient::new();
        let orchestrator = ExpansionOrchestrator::with_config(client, fast_config());
        let mut cache = ExpansionCache::default();

        let run = orchestrator
            .run_expansion(
                candidates(&["1", "bad-2"]),
                &RunOptions::default(),
                &mut cache,
                &CodeMappingTable::new(),
            )
            .unwrap();

        assert_eq!(run.failed_count(), 1);
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].code, "bad-2");
        assert!(cache.contains("1", false));
        assert!(!cache.contains("bad-2", false));
    }

    #[test]
    fn test_setup_error_before_dispatch() {
        let orchestrator =
            ExpansionOrchestrator::with_config(Arc::new(RefusingClient), fast_config());
        let mut cache = ExpansionCache::default();

        let err = orchestrator
            .run_expansion(
                candidates(&["1"]),
                &RunOptions::default(),
                &mut cache,
                &CodeMappingTable::new(),
            )
            .unwrap_err();

        assert!(matches!(err, crate::error::ExpansionError::ClientSetup(_)));
    }

    #[test]
    fn test_prepare_skipped_when_everything_cached() {
        let orchestrator =
            ExpansionOrchestrator::with_config(Arc::new(RefusingClient), fast_config());
        let mut cache = ExpansionCache::default();
        cache.insert(false, ExpansionResult::success("1", "One", Vec::new()));

        let run = orchestrator
            .run_expansion(
                candidates(&["1"]),
                &RunOptions::default(),
                &mut cache,
                &CodeMappingTable::new(),
            )
            .unwrap();

        assert_eq!(run.outcome.cached_count, 1);
        assert_eq!(run.outcome.worker_count, 0);
        assert!(run.failures.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OrchestratorConfig::builder()
            .with_sizing(WorkerSizing::fixed(0))
            .build();
        let orchestrator = ExpansionOrchestrator::with_config(CountingClient::new(), config);
        let mut cache = ExpansionCache::default();

        let result = orchestrator.run_expansion(
            candidates(&["1"]),
            &RunOptions::default(),
            &mut cache,
            &CodeMappingTable::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_progress_reported_per_completion() {
        let orchestrator = ExpansionOrchestrator::with_config(CountingClient::new(), fast_config());
        let mut cache = ExpansionCache::default();
        let mut updates = Vec::new();

        orchestrator
            .run_expansion_with_progress(
                candidates(&["1", "2", "3", "4"]),
                &RunOptions::default(),
                &mut cache,
                &CodeMappingTable::new(),
                &mut |done: usize, total: usize| updates.push((done, total)),
            )
            .unwrap();

        assert_eq!(updates, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn test_empty_input() {
        let client = CountingClient::new();
        let orchestrator = ExpansionOrchestrator::with_config(client.clone(), fast_config());
        let mut cache = ExpansionCache::default();

        let run = orchestrator
            .run_expansion(
                Vec::new(),
                &RunOptions::default(),
                &mut cache,
                &CodeMappingTable::new(),
            )
            .unwrap();

        assert_eq!(run.completed_count(), 0);
        assert!(run.records.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
