//! # snomed-expand
//!
//! Concurrent descendant expansion of SNOMED CT codes.
//!
//! Given a batch of codes flagged "expand to descendants", this crate
//! deduplicates them, serves what it can from a session cache, expands the rest
//! against a remote terminology service with a bounded pool of worker threads,
//! and flattens the results into rows joined against a local code mapping
//! table.
//!
//! ## Key Features
//!
//! - **One call per unique code** - duplicate references are merged, sources kept
//! - **Adaptive pool** - 8 to 20 workers depending on workload size
//! - **Single-writer aggregation** - cache, counters and progress callbacks are
//!   only touched by the calling thread
//! - **Partial failure tolerance** - failing codes are reported, not raised
//! - **Stall protection** - a run with no progress is abandoned with partial results
//!
//! ## Quick Start
//!
//! ```ignore
//! use snomed_expand::{
//!     CodeMappingTable, ExpansionCache, ExpansionCandidate, ExpansionOrchestrator,
//!     RunOptions, SourceRef, ViewMode,
//! };
//! use std::sync::Arc;
//!
//! let orchestrator = ExpansionOrchestrator::new(Arc::new(client));
//! let mut cache = ExpansionCache::default();
//! let mapping: CodeMappingTable = [("46635009", "C108.")].into_iter().collect();
//!
//! let candidates = vec![
//!     ExpansionCandidate::new("73211009", false, SourceRef::new("r1", "Diabetes register", "QOF")),
//!     ExpansionCandidate::new("73211009", false, SourceRef::new("r2", "Diabetes review", "Audit")),
//! ];
//!
//! let options = RunOptions { view_mode: ViewMode::PerSource, ..RunOptions::default() };
//! let run = orchestrator.run_expansion(candidates, &options, &mut cache, &mapping)?;
//!
//! for record in &run.records {
//!     println!("{} -> {} ({})", record.parent_code, record.child_code, record.mapped_local_id);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       snomed-expand                           │
//! │                                                               │
//! │  ExpansionOrchestrator::run_expansion                         │
//! │  ├── select_candidates  → dedup, skip zero, cache partition   │
//! │  ├── WorkerPool         → N worker threads, completion queue  │
//! │  │                        (calling thread aggregates, caches) │
//! │  └── ResultReducer      → ChildCodeRecord rows + failures     │
//! │                                                               │
//! │  Seams:                                                       │
//! │  ├── ExpansionClient    - remote expand(code) call            │
//! │  ├── ProgressReporter   - progress on the calling thread      │
//! │  └── CodeMappingSource  - external code → local id table      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - Serialize/Deserialize for the public data types

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod cancel;
mod config;
mod error;
mod mapping;
mod orchestrator;
mod reducer;
mod result;
mod selector;
mod stats;
mod traits;
mod types;
mod worker;

// Public re-exports
pub use cache::{CacheEntry, CacheKey, CacheStats, ExpansionCache};
pub use cancel::CancellationToken;
pub use config::{CacheConfig, OrchestratorConfig, OrchestratorConfigBuilder, WorkerSizing};
pub use error::{ClientError, ExpandResult, ExpansionError};
pub use mapping::CodeMappingTable;
pub use orchestrator::ExpansionOrchestrator;
pub use reducer::{Reduction, ResultReducer};
pub use result::{ExpansionOutcome, ExpansionRunResult, RunStatus};
pub use selector::{merge_candidates, select_candidates, Selection};
pub use stats::RunStats;
pub use traits::{CodeMappingSource, ExpansionClient, NoProgress, ProgressReporter};
pub use types::{
    ChildCodeRecord, ChildConcept, ExpansionCandidate, ExpansionResult, FailureSummary, MappedId,
    RunOptions, SourceRef, ViewMode,
};
pub use worker::{Task, TaskOutcome, TaskState};
