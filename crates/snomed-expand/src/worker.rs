//! Worker threads: one remote call per task, result pushed to the completion queue.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::cancel::CancellationToken;
use crate::error::ClientError;
use crate::traits::ExpansionClient;
use crate::types::{ExpansionCandidate, ExpansionResult};

/// Lifecycle of a task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for a free worker slot.
    Queued,
    /// Bound to a worker whose call is in flight.
    Dispatched,
    /// The worker reported back.
    Completed(TaskOutcome),
}

/// How a completed task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The expansion succeeded.
    Success,
    /// The expansion failed.
    Error,
}

/// A candidate bound to a worker slot.
#[derive(Debug, Clone)]
pub struct Task {
    /// Worker slot id, reused as slots free up.
    pub slot: usize,
    /// The candidate being expanded.
    pub candidate: ExpansionCandidate,
    /// Current state.
    pub state: TaskState,
}

impl Task {
    pub(crate) fn queued(slot: usize, candidate: ExpansionCandidate) -> Self {
        Self {
            slot,
            candidate,
            state: TaskState::Queued,
        }
    }

    pub(crate) fn complete(&mut self, result: &ExpansionResult) {
        self.state = TaskState::Completed(if result.is_success() {
            TaskOutcome::Success
        } else {
            TaskOutcome::Error
        });
    }
}

/// Message a worker sends when its call returns.
#[derive(Debug)]
pub(crate) struct Completion {
    pub slot: usize,
    pub candidate: ExpansionCandidate,
    pub result: ExpansionResult,
}

/// Spawns a named worker thread for `task`.
///
/// The worker never touches shared state: it makes one call, and unless the
/// run was cancelled meanwhile, sends the outcome on `completions`.
pub(crate) fn spawn_worker(
    task: &mut Task,
    client: Arc<dyn ExpansionClient>,
    cancel: CancellationToken,
    completions: Sender<Completion>,
) -> io::Result<JoinHandle<()>> {
    let slot = task.slot;
    let candidate = task.candidate.clone();

    let handle = thread::Builder::new()
        .name(format!("expand-worker-{slot}"))
        .spawn(move || {
            let result = run_call(client.as_ref(), &candidate, &cancel);
            if cancel.is_cancelled() {
                tracing::debug!(
                    slot,
                    code = %candidate.code,
                    "run cancelled, dropping late result"
                );
                return;
            }
            // The receiver is gone only if the run has already returned.
            let _ = completions.send(Completion {
                slot,
                candidate,
                result,
            });
        })?;

    task.state = TaskState::Dispatched;
    Ok(handle)
}

/// Performs the remote call and folds every failure mode into a result.
pub(crate) fn run_call(
    client: &dyn ExpansionClient,
    candidate: &ExpansionCandidate,
    cancel: &CancellationToken,
) -> ExpansionResult {
    let call = panic::catch_unwind(AssertUnwindSafe(|| {
        client.expand(&candidate.code, candidate.include_inactive, cancel)
    }));

    let mut result = match call {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => ExpansionResult::failure(&candidate.code, err.to_string()),
        Err(_) => ExpansionResult::failure(
            &candidate.code,
            ClientError::Worker("client panicked during expansion".to_string()).to_string(),
        ),
    };

    result.code.clone_from(&candidate.code);
    if result.display_name.is_empty() {
        if let Some(name) = &candidate.display_name {
            result.display_name.clone_from(name);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChildConcept, SourceRef};
    use std::sync::mpsc;

    struct FixedClient;

    impl ExpansionClient for FixedClient {
        fn expand(
            &self,
            code: &str,
            _include_inactive: bool,
            _cancel: &CancellationToken,
        ) -> Result<ExpansionResult, ClientError> {
            match code {
                "fail" => Err(ClientError::Transport("connection reset".to_string())),
                "panic" => panic!("boom"),
                _ => Ok(ExpansionResult::success(
                    "",
                    "",
                    vec![ChildConcept::new("child", "Child")],
                )),
            }
        }
    }

    fn candidate(code: &str) -> ExpansionCandidate {
        ExpansionCandidate::new(code, false, SourceRef::new("s", "S", "F"))
            .with_display_name("Known name")
    }

    #[test]
    fn test_run_call_success_fills_identity() {
        let result = run_call(&FixedClient, &candidate("100"), &CancellationToken::new());
        assert!(result.is_success());
        assert_eq!(result.code, "100");
        assert_eq!(result.display_name, "Known name");
    }

    #[test]
    fn test_run_call_error_becomes_failure() {
        let result = run_call(&FixedClient, &candidate("fail"), &CancellationToken::new());
        assert_eq!(
            result.error.as_deref(),
            Some("transport error: connection reset")
        );
        assert_eq!(result.display_name, "Known name");
    }

    #[test]
    fn test_run_call_panic_becomes_failure() {
        let result = run_call(&FixedClient, &candidate("panic"), &CancellationToken::new());
        assert!(result
            .error
            .as_deref()
            .is_some_and(|e| e.contains("client panicked")));
    }

    #[test]
    fn test_spawn_worker_sends_completion() {
        let (tx, rx) = mpsc::channel();
        let mut task = Task::queued(3, candidate("100"));
        let handle = spawn_worker(&mut task, Arc::new(FixedClient), CancellationToken::new(), tx)
            .expect("spawn");
        assert_eq!(task.state, TaskState::Dispatched);

        let completion = rx.recv().expect("completion");
        handle.join().expect("worker panicked");
        assert_eq!(completion.slot, 3);
        assert_eq!(completion.candidate.code, "100");
        assert!(completion.result.is_success());

        task.complete(&completion.result);
        assert_eq!(task.state, TaskState::Completed(TaskOutcome::Success));
    }

    #[test]
    fn test_cancelled_worker_sends_nothing() {
        let (tx, rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut task = Task::queued(0, candidate("100"));
        let handle = spawn_worker(&mut task, Arc::new(FixedClient), cancel, tx).expect("spawn");
        handle.join().expect("worker panicked");
        assert!(rx.try_recv().is_err());
    }
}
