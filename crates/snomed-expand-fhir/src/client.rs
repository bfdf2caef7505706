//! Blocking FHIR `$expand` client.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, warn};

use snomed_expand::{CancellationToken, ClientError, ExpansionClient, ExpansionResult};

use crate::auth::TokenProvider;
use crate::config::FhirClientConfig;
use crate::error::{FhirError, FhirResult};
use crate::response::{parse_expansion_page, parse_outcome_message};

const FHIR_JSON: &str = "application/fhir+json";

/// Expands SNOMED CT codes to their descendants through a FHIR terminology
/// server's `ValueSet/$expand` operation.
///
/// One instance is shared by every worker thread of a run. The underlying
/// HTTP client pools connections and the bearer token is cached.
///
/// # Example
///
/// ```no_run
/// use snomed_expand::ExpansionOrchestrator;
/// use snomed_expand_fhir::{FhirClientConfig, FhirTerminologyClient};
/// use std::sync::Arc;
///
/// let config = FhirClientConfig::builder("https://tx.example.org/fhir")
///     .build()
///     .unwrap();
/// let client = FhirTerminologyClient::new(config).unwrap();
/// let orchestrator = ExpansionOrchestrator::new(Arc::new(client));
/// ```
#[derive(Debug)]
pub struct FhirTerminologyClient {
    config: FhirClientConfig,
    http: Client,
    auth: Option<TokenProvider>,
}

impl FhirTerminologyClient {
    /// Creates a client from the given configuration.
    pub fn new(config: FhirClientConfig) -> FhirResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let auth = match (&config.token_url, &config.credentials) {
            (Some(token_url), Some(credentials)) => {
                Some(TokenProvider::new(token_url.clone(), credentials.clone()))
            }
            _ => None,
        };

        Ok(Self { config, http, auth })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &FhirClientConfig {
        &self.config
    }

    /// Builds the `$expand` URL for one page of `<< code`.
    pub fn expand_url(&self, code: &str, include_inactive: bool, offset: usize) -> String {
        let value_set = format!("{}?fhir_vs=ecl/<< {}", self.config.code_system, code);
        format!(
            "{}/ValueSet/$expand?url={}&count={}&offset={}&activeOnly={}",
            self.config.base_url,
            urlencoding::encode(&value_set),
            self.config.page_size,
            offset,
            !include_inactive
        )
    }

    fn check_auth_settings(&self) -> FhirResult<()> {
        match (&self.config.token_url, &self.config.credentials) {
            (Some(_), None) => Err(FhirError::Unauthorized(
                "token URL configured without client credentials".to_string(),
            )),
            (None, Some(_)) => Err(FhirError::Unauthorized(
                "client credentials configured without token URL".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> FhirResult<RequestBuilder> {
        match &self.auth {
            Some(auth) => Ok(request.bearer_auth(auth.bearer_token(&self.http)?)),
            None => Ok(request),
        }
    }

    fn fetch_page(&self, code: &str, include_inactive: bool, offset: usize) -> FhirResult<String> {
        let url = self.expand_url(code, include_inactive, offset);
        debug!(code, offset, "Fetching expansion page");

        let request = self
            .http
            .get(&url)
            .header(ACCEPT, FHIR_JSON)
            .header(USER_AGENT, concat!("snomed-expand/", env!("CARGO_PKG_VERSION")));
        let response = self.authorize(request)?.send()?;

        let status = response.status();
        let body = response.text()?;
        if status.is_success() {
            return Ok(body);
        }

        let message = parse_outcome_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                if let Some(auth) = &self.auth {
                    auth.invalidate();
                }
                Err(FhirError::Unauthorized(message))
            }
            StatusCode::NOT_FOUND => Err(FhirError::NotFound(format!("{code}: {message}"))),
            _ => Err(FhirError::Status {
                status: status.as_u16(),
                message,
            }),
        }
    }

    /// Expands `code`, following pages until the server's total is reached.
    pub fn expand_code(
        &self,
        code: &str,
        include_inactive: bool,
        cancel: &CancellationToken,
    ) -> FhirResult<ExpansionResult> {
        let mut parent_display = None;
        let mut children = Vec::new();
        let mut offset = 0;
        let mut seen_rows = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(FhirError::Cancelled);
            }

            let body = self.fetch_page(code, include_inactive, offset)?;
            let page = parse_expansion_page(code, &body)?;

            if page.parent_display.is_some() {
                parent_display = page.parent_display;
            }
            children.extend(page.children);
            seen_rows += page.row_count;
            offset += page.row_count;

            let done = match page.total {
                Some(total) => seen_rows >= total,
                None => page.row_count < self.config.page_size,
            };
            if page.row_count == 0 || done {
                break;
            }
        }

        // `<< code` always contains the code itself when the code exists
        if seen_rows == 0 {
            return Err(FhirError::NotFound(code.to_string()));
        }

        Ok(ExpansionResult::success(
            code,
            parent_display.unwrap_or_default(),
            children,
        ))
    }
}

impl ExpansionClient for FhirTerminologyClient {
    fn prepare(&self) -> Result<(), ClientError> {
        self.check_auth_settings()?;
        if let Some(auth) = &self.auth {
            auth.bearer_token(&self.http).map_err(|err| {
                warn!(error = %err, "Could not obtain access token");
                ClientError::Auth(err.to_string())
            })?;
        }
        Ok(())
    }

    fn expand(
        &self,
        code: &str,
        include_inactive: bool,
        cancel: &CancellationToken,
    ) -> Result<ExpansionResult, ClientError> {
        self.expand_code(code, include_inactive, cancel)
            .map_err(ClientError::from)
    }
}
