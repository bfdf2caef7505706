//! Wire models for the FHIR responses the client consumes.
//!
//! Only the fields the client reads are modelled; everything else in the
//! resource is ignored.

use serde::Deserialize;
use snomed_expand::ChildConcept;

use crate::error::{FhirError, FhirResult};

/// A `ValueSet` resource returned by `$expand`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetResponse {
    /// Must be `ValueSet`.
    pub resource_type: String,
    /// The expansion block, absent when the server did not expand.
    pub expansion: Option<Expansion>,
}

/// The `ValueSet.expansion` element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expansion {
    /// Total number of rows across all pages, when the server reports it.
    pub total: Option<usize>,
    /// Offset of this page.
    pub offset: Option<usize>,
    /// Rows on this page.
    #[serde(default)]
    pub contains: Vec<ExpansionRow>,
}

/// One `ValueSet.expansion.contains` row.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionRow {
    /// Code system URI.
    pub system: Option<String>,
    /// Concept code.
    pub code: String,
    /// Preferred term.
    pub display: Option<String>,
    /// True if the concept is inactive.
    #[serde(default)]
    pub inactive: bool,
}

/// An `OperationOutcome` returned alongside error statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationOutcome {
    #[serde(default)]
    issue: Vec<OutcomeIssue>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutcomeIssue {
    diagnostics: Option<String>,
    details: Option<OutcomeDetails>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutcomeDetails {
    text: Option<String>,
}

impl OperationOutcome {
    /// First human-readable message in the outcome, if any.
    pub fn message(&self) -> Option<String> {
        self.issue.iter().find_map(|issue| {
            issue
                .diagnostics
                .clone()
                .or_else(|| issue.details.as_ref().and_then(|d| d.text.clone()))
        })
    }
}

/// OAuth2 token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}

/// One decoded `$expand` page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionPage {
    /// Preferred term of the parent code, if the page contained it.
    pub parent_display: Option<String>,
    /// Descendant rows on this page.
    pub children: Vec<ChildConcept>,
    /// Rows on the page, parent included.
    pub row_count: usize,
    /// Server-reported total across all pages.
    pub total: Option<usize>,
}

/// Decodes a `$expand` response body for `parent_code`.
///
/// The row equal to the parent code supplies the parent's display name and is
/// left out of the children.
pub fn parse_expansion_page(parent_code: &str, body: &str) -> FhirResult<ExpansionPage> {
    let value_set: ValueSetResponse = serde_json::from_str(body)?;
    if value_set.resource_type != "ValueSet" {
        return Err(FhirError::Decode(format!(
            "expected ValueSet, got {}",
            value_set.resource_type
        )));
    }
    let expansion = value_set
        .expansion
        .ok_or_else(|| FhirError::Decode("ValueSet has no expansion".to_string()))?;

    let mut page = ExpansionPage {
        row_count: expansion.contains.len(),
        total: expansion.total,
        ..ExpansionPage::default()
    };

    for row in expansion.contains {
        let display = row.display.unwrap_or_default();
        if row.code == parent_code {
            page.parent_display = Some(display);
        } else {
            page.children.push(ChildConcept {
                code: row.code,
                display_name: display,
                inactive: row.inactive,
            });
        }
    }

    Ok(page)
}

/// Extracts a message from an error response body, if it is an OperationOutcome.
pub fn parse_outcome_message(body: &str) -> Option<String> {
    serde_json::from_str::<OperationOutcome>(body)
        .ok()
        .and_then(|outcome| outcome.message())
}
