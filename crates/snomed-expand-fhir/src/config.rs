//! Configuration for the FHIR terminology client.

use std::time::Duration;

use crate::error::{FhirError, FhirResult};

/// Default SNOMED CT code system URI.
pub const SNOMED_CT_SYSTEM: &str = "http://snomed.info/sct";

/// OAuth2 client-credentials pair.
#[derive(Clone)]
pub struct ClientCredentials {
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Configuration for [`FhirTerminologyClient`](crate::FhirTerminologyClient).
///
/// Credentials are passed in explicitly; nothing is read from the environment.
///
/// # Example
///
/// ```rust
/// use snomed_expand_fhir::FhirClientConfig;
/// use std::time::Duration;
///
/// let config = FhirClientConfig::builder("https://ontology.example.org/fhir")
///     .with_token_url("https://ontology.example.org/authorisation/token")
///     .with_credentials("my-client", "my-secret")
///     .with_timeout(Duration::from_secs(20))
///     .with_page_size(500)
///     .build()
///     .unwrap();
///
/// assert!(config.has_auth());
/// ```
#[derive(Debug, Clone)]
pub struct FhirClientConfig {
    /// Base URL of the FHIR server, without trailing slash.
    pub base_url: String,
    /// OAuth2 token endpoint (None = unauthenticated server).
    pub token_url: Option<String>,
    /// OAuth2 client credentials.
    pub credentials: Option<ClientCredentials>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Rows requested per `$expand` page.
    pub page_size: usize,
    /// Code system the expanded codes belong to.
    pub code_system: String,
}

impl FhirClientConfig {
    /// Creates a new builder for FhirClientConfig.
    pub fn builder(base_url: impl Into<String>) -> FhirClientConfigBuilder {
        FhirClientConfigBuilder::new(base_url)
    }

    /// Returns true if token-based authentication is configured.
    pub fn has_auth(&self) -> bool {
        self.token_url.is_some() || self.credentials.is_some()
    }
}

/// Builder for FhirClientConfig.
#[derive(Debug, Clone)]
pub struct FhirClientConfigBuilder {
    base_url: String,
    token_url: Option<String>,
    credentials: Option<ClientCredentials>,
    request_timeout: Duration,
    page_size: usize,
    code_system: String,
}

impl FhirClientConfigBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_url: None,
            credentials: None,
            request_timeout: Duration::from_secs(30),
            page_size: 1000,
            code_system: SNOMED_CT_SYSTEM.to_string(),
        }
    }

    /// Sets the OAuth2 token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    /// Sets the OAuth2 client credentials.
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.credentials = Some(ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        });
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the `$expand` page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the code system URI.
    pub fn with_code_system(mut self, code_system: impl Into<String>) -> Self {
        self.code_system = code_system.into();
        self
    }

    /// Builds the FhirClientConfig.
    ///
    /// Fails if the base URL is not an http(s) URL or the page size is zero.
    /// Mismatched authentication settings are reported later, by `prepare`.
    pub fn build(self) -> FhirResult<FhirClientConfig> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FhirError::InvalidConfig(format!(
                "base URL must be http(s): {base_url:?}"
            )));
        }
        if self.page_size == 0 {
            return Err(FhirError::InvalidConfig(
                "page size must be non-zero".to_string(),
            ));
        }

        Ok(FhirClientConfig {
            base_url,
            token_url: self.token_url,
            credentials: self.credentials,
            request_timeout: self.request_timeout,
            page_size: self.page_size,
            code_system: self.code_system,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = FhirClientConfig::builder("https://tx.example.org/fhir/")
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://tx.example.org/fhir");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.code_system, SNOMED_CT_SYSTEM);
        assert!(!config.has_auth());
    }

    #[test]
    fn test_builder_with_auth() {
        let config = FhirClientConfig::builder("https://tx.example.org/fhir")
            .with_token_url("https://tx.example.org/token")
            .with_credentials("id", "secret")
            .with_page_size(200)
            .build()
            .unwrap();

        assert!(config.has_auth());
        assert_eq!(config.page_size, 200);
        assert_eq!(
            config.credentials.as_ref().map(|c| c.client_id.as_str()),
            Some("id")
        );
    }

    #[test]
    fn test_rejects_non_http_base() {
        let err = FhirClientConfig::builder("ftp://tx.example.org")
            .build()
            .unwrap_err();
        assert!(matches!(err, FhirError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_page_size() {
        assert!(FhirClientConfig::builder("https://tx.example.org")
            .with_page_size(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = FhirClientConfig::builder("https://tx.example.org")
            .with_credentials("id", "super-secret")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("***"));
    }
}
