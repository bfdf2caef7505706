//! # snomed-expand-fhir
//!
//! FHIR terminology server client for `snomed-expand`.
//!
//! [`FhirTerminologyClient`] implements
//! [`ExpansionClient`](snomed_expand::ExpansionClient) on top of the
//! `ValueSet/$expand` operation with an implicit ECL value set
//! (`http://snomed.info/sct?fhir_vs=ecl/<< {code}`). Servers protected by
//! OAuth2 client credentials are supported; the token is fetched once in
//! `prepare` and shared by all workers.
//!
//! ## Example
//!
//! ```no_run
//! use snomed_expand::{CodeMappingTable, ExpansionCache, ExpansionOrchestrator, RunOptions};
//! use snomed_expand_fhir::{FhirClientConfig, FhirTerminologyClient};
//! use std::sync::Arc;
//!
//! let config = FhirClientConfig::builder("https://ontology.example.org/fhir")
//!     .with_token_url("https://ontology.example.org/authorisation/token")
//!     .with_credentials("client-id", "client-secret")
//!     .build()?;
//!
//! let orchestrator = ExpansionOrchestrator::new(Arc::new(FhirTerminologyClient::new(config)?));
//! let mut cache = ExpansionCache::default();
//! let run = orchestrator.run_expansion(
//!     Vec::new(),
//!     &RunOptions::default(),
//!     &mut cache,
//!     &CodeMappingTable::new(),
//! )?;
//! println!("{}", run.outcome.stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod auth;
mod client;
mod config;
mod error;
mod response;

pub use auth::TokenProvider;
pub use client::FhirTerminologyClient;
pub use config::{ClientCredentials, FhirClientConfig, FhirClientConfigBuilder, SNOMED_CT_SYSTEM};
pub use error::{FhirError, FhirResult};
pub use response::{
    parse_expansion_page, parse_outcome_message, Expansion, ExpansionPage, ExpansionRow,
    OperationOutcome, TokenResponse, ValueSetResponse,
};
