//! Cooperative cancellation shared between a run and its workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable flag signalling that a run no longer wants results.
///
/// The orchestrator cancels the token when a run ends (normally or through a
/// stall abort). Clients may check it before and after network calls; workers
/// that finish after cancellation drop their result.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_uncancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn test_cancel_visible_through_clones() {
        let token = CancellationToken::new();
        let worker_copy = token.clone();
        token.cancel();
        assert!(worker_copy.is_cancelled());
    }

    #[test]
    fn test_cancel_across_threads() {
        let token = CancellationToken::new();
        let worker_copy = token.clone();
        let handle = std::thread::spawn(move || {
            while !worker_copy.is_cancelled() {
                std::thread::yield_now();
            }
            true
        });
        token.cancel();
        assert!(handle.join().expect("thread panicked"));
    }
}
