//! Core data types for descendant expansion.

use std::fmt;

/// Where a code was referenced in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceRef {
    /// Identifier of the originating report or search.
    pub source_id: String,
    /// Human-readable name of the originating report or search.
    pub display_name: String,
    /// Folder or container the source lives in.
    pub container: String,
}

impl SourceRef {
    /// Creates a new source reference.
    pub fn new(
        source_id: impl Into<String>,
        display_name: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            display_name: display_name.into(),
            container: container.into(),
        }
    }
}

/// A terminology code proposed for expansion to its descendants.
///
/// Before selection the same code may appear several times; after selection
/// candidates are unique by `code` and `sources` holds every reference.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionCandidate {
    /// The terminology code (e.g. a SNOMED CT concept id).
    pub code: String,
    /// Display name known from the source document, if any.
    pub display_name: Option<String>,
    /// Whether inactive descendants should be returned.
    pub include_inactive: bool,
    /// Most recently known descendant count, if any.
    pub descendant_count: Option<usize>,
    /// Every place this code was referenced.
    pub sources: Vec<SourceRef>,
}

impl ExpansionCandidate {
    /// Creates a candidate with a single source.
    pub fn new(code: impl Into<String>, include_inactive: bool, source: SourceRef) -> Self {
        Self {
            code: code.into(),
            display_name: None,
            include_inactive,
            descendant_count: None,
            sources: vec![source],
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the known descendant count.
    pub fn with_descendant_count(mut self, count: usize) -> Self {
        self.descendant_count = Some(count);
        self
    }
}

/// A descendant concept returned by the terminology server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildConcept {
    /// Concept code.
    pub code: String,
    /// Preferred display term.
    pub display_name: String,
    /// Whether the concept is inactive.
    pub inactive: bool,
}

impl ChildConcept {
    /// Creates an active child concept.
    pub fn new(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            inactive: false,
        }
    }

    /// Creates an inactive child concept.
    pub fn inactive(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            inactive: true,
            ..Self::new(code, display_name)
        }
    }
}

/// Outcome of expanding one code.
///
/// When `error` is set the `children` list carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionResult {
    /// The expanded code.
    pub code: String,
    /// Display name of the expanded code.
    pub display_name: String,
    /// Descendants in the order returned by the server.
    pub children: Vec<ChildConcept>,
    /// Error message when the expansion failed.
    pub error: Option<String>,
}

impl ExpansionResult {
    /// Creates a successful result.
    pub fn success(
        code: impl Into<String>,
        display_name: impl Into<String>,
        children: Vec<ChildConcept>,
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            children,
            error: None,
        }
    }

    /// Creates a failed result.
    pub fn failure(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display_name: String::new(),
            children: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Returns true if the expansion succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Number of descendants (zero for failures).
    pub fn child_count(&self) -> usize {
        if self.is_success() {
            self.children.len()
        } else {
            0
        }
    }
}

/// Local identifier resolved for a child code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MappedId {
    /// The code maps to this local identifier.
    Mapped(String),
    /// The code is not in the mapping table.
    Absent,
}

impl MappedId {
    /// Returns true if a local identifier was found.
    pub fn is_mapped(&self) -> bool {
        matches!(self, MappedId::Mapped(_))
    }

    /// Returns the local identifier, if any.
    pub fn as_local_id(&self) -> Option<&str> {
        match self {
            MappedId::Mapped(id) => Some(id),
            MappedId::Absent => None,
        }
    }
}

impl fmt::Display for MappedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedId::Mapped(id) => f.write_str(id),
            MappedId::Absent => f.write_str("absent"),
        }
    }
}

/// One flattened row of an expansion, joined against the mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildCodeRecord {
    /// Expanded code.
    pub parent_code: String,
    /// Display name of the expanded code.
    pub parent_display: String,
    /// Descendant code.
    pub child_code: String,
    /// Display name of the descendant.
    pub child_display: String,
    /// Whether the descendant is inactive.
    pub inactive: bool,
    /// Local identifier of the descendant.
    pub mapped_local_id: MappedId,
    /// Sources this row is attributed to.
    pub sources: Vec<SourceRef>,
}

/// A code whose expansion failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailureSummary {
    /// The code that failed.
    pub code: String,
    /// Display name, if known from the source document or the server.
    pub display_name: Option<String>,
    /// Error message.
    pub error: String,
}

/// How reduced records are deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewMode {
    /// One record per (parent, child) pair.
    #[default]
    Unique,
    /// One record per (parent, child, source) triple.
    PerSource,
}

/// Options for one expansion run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunOptions {
    /// Request inactive descendants for every candidate.
    pub include_inactive: bool,
    /// Skip candidates known to have no descendants.
    pub skip_zero_descendants: bool,
    /// Serve candidates from the cache when possible.
    pub use_cache: bool,
    /// Record deduplication mode.
    pub view_mode: ViewMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_inactive: false,
            skip_zero_descendants: false,
            use_cache: true,
            view_mode: ViewMode::Unique,
        }
    }
}
