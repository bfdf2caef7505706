//! Traits at the seams between the orchestrator and its collaborators.
//!
//! The orchestrator owns no network, document or UI code. Collaborators plug
//! in through three traits:
//!
//! - [`ExpansionClient`] performs the remote descendant lookup.
//! - [`ProgressReporter`] receives progress updates on the aggregating thread.
//! - [`CodeMappingSource`] builds the local code mapping table.
//!
//! # Example: a client backed by an in-memory hierarchy
//!
//! ```
//! use snomed_expand::{
//!     CancellationToken, ChildConcept, ClientError, ExpansionClient, ExpansionResult,
//! };
//! use std::collections::HashMap;
//!
//! struct StaticClient {
//!     children: HashMap<String, Vec<ChildConcept>>,
//! }
//!
//! impl ExpansionClient for StaticClient {
//!     fn expand(
//!         &self,
//!         code: &str,
//!         _include_inactive: bool,
//!         _cancel: &CancellationToken,
//!     ) -> Result<ExpansionResult, ClientError> {
//!         let children = self
//!             .children
//!             .get(code)
//!             .cloned()
//!             .ok_or_else(|| ClientError::NotFound(code.to_string()))?;
//!         Ok(ExpansionResult::success(code, code, children))
//!     }
//! }
//! ```

use crate::cancel::CancellationToken;
use crate::error::{ClientError, ExpandResult};
use crate::mapping::CodeMappingTable;
use crate::types::ExpansionResult;

/// A remote terminology service that can expand a code to its descendants.
///
/// Implementations are shared by all workers of a run, so they must be
/// `Send + Sync`. Each call is made on a worker thread and should rely on its
/// own request timeout; the orchestrator never interrupts a call.
pub trait ExpansionClient: Send + Sync {
    /// Checks that the client can make calls (credentials, endpoint).
    ///
    /// Called once on the calling thread before any worker starts. An error
    /// aborts the run synchronously.
    fn prepare(&self) -> Result<(), ClientError> {
        Ok(())
    }

    /// Expands `code` to its descendants.
    ///
    /// `cancel` is cancelled when the run stops waiting for this call.
    fn expand(
        &self,
        code: &str,
        include_inactive: bool,
        cancel: &CancellationToken,
    ) -> Result<ExpansionResult, ClientError>;
}

/// Receives progress updates during a run.
///
/// Only ever invoked from the aggregating thread, so implementations may
/// touch single-threaded presentation state.
pub trait ProgressReporter {
    /// Reports that `completed` of `total` dispatched candidates have finished.
    fn report_progress(&mut self, completed: usize, total: usize);
}

impl<F> ProgressReporter for F
where
    F: FnMut(usize, usize),
{
    fn report_progress(&mut self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// A progress reporter that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report_progress(&mut self, _completed: usize, _total: usize) {}
}

/// Builds the code mapping table for one uploaded document.
pub trait CodeMappingSource {
    /// Loads the external code → local identifier table.
    fn load_code_mapping_table(&self) -> ExpandResult<CodeMappingTable>;
}
