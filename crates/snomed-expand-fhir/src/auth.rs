//! OAuth2 client-credentials token cache.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use reqwest::blocking::Client;
use tracing::debug;

use crate::config::ClientCredentials;
use crate::error::{FhirError, FhirResult};
use crate::response::TokenResponse;

/// Tokens are refreshed this long before the server says they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }
}

/// Fetches and caches bearer tokens for the worker threads.
///
/// Workers share one token; only a thread that finds it stale takes the
/// write lock and goes back to the token endpoint.
pub struct TokenProvider {
    token_url: String,
    credentials: ClientCredentials,
    token: RwLock<Option<AccessToken>>,
}

impl TokenProvider {
    /// Creates a provider for the given endpoint and credentials.
    pub fn new(token_url: impl Into<String>, credentials: ClientCredentials) -> Self {
        Self {
            token_url: token_url.into(),
            credentials,
            token: RwLock::new(None),
        }
    }

    /// Returns a valid bearer token, fetching a new one if needed.
    pub fn bearer_token(&self, http: &Client) -> FhirResult<String> {
        let now = Instant::now();
        if let Some(token) = self.token.read().as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let mut guard = self.token.write();
        // Another worker may have refreshed while we waited for the lock
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let token = self.fetch(http)?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Drops the cached token so the next call fetches a fresh one.
    pub fn invalidate(&self) {
        *self.token.write() = None;
    }

    fn fetch(&self, http: &Client) -> FhirResult<AccessToken> {
        debug!(token_url = %self.token_url, "Requesting access token");

        let response = http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(FhirError::Unauthorized(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token_from_response(token, Instant::now()))
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("token_url", &self.token_url)
            .field("credentials", &self.credentials)
            .field("has_token", &self.token.read().is_some())
            .finish()
    }
}

fn token_from_response(response: TokenResponse, issued_at: Instant) -> AccessToken {
    let lifetime = response
        .expires_in
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_LIFETIME);
    AccessToken {
        value: response.access_token,
        expires_at: issued_at + lifetime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    #[test]
    fn test_token_freshness_margin() {
        let now = Instant::now();
        let token = token_from_response(
            TokenResponse {
                access_token: "abc".to_string(),
                expires_in: Some(3600),
                token_type: None,
            },
            now,
        );
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::from_secs(3550)));
    }

    #[test]
    fn test_short_lived_token_is_never_fresh() {
        let now = Instant::now();
        let token = token_from_response(
            TokenResponse {
                access_token: "abc".to_string(),
                expires_in: Some(30),
                token_type: None,
            },
            now,
        );
        assert!(!token.is_fresh(now));
    }

    #[test]
    fn test_default_lifetime() {
        let now = Instant::now();
        let token = token_from_response(
            TokenResponse {
                access_token: "abc".to_string(),
                expires_in: None,
                token_type: None,
            },
            now,
        );
        assert_eq!(token.expires_at, now + DEFAULT_LIFETIME);
    }

    #[test]
    fn test_cached_token_is_reused() {
        let provider = TokenProvider::new("http://127.0.0.1:9/token", credentials());
        *provider.token.write() = Some(AccessToken {
            value: "cached".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        });

        let http = Client::new();
        assert_eq!(provider.bearer_token(&http).unwrap(), "cached");

        provider.invalidate();
        assert!(provider.token.read().is_none());
    }

    #[test]
    fn test_debug_hides_secret() {
        let provider = TokenProvider::new("http://localhost/token", credentials());
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("has_token: false"));
    }
}
