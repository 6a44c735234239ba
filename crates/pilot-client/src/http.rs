//! `ApiClient` and the retrying HTTP transport.
//!
//! Every request goes through [`ApiClient::send_checked`]: non-2xx statuses
//! are mapped onto the [`PilotError`] taxonomy, and faults classified as
//! retryable (429 and 5xx-class, plus connection failures) are retried with
//! exponential backoff and jitter, honoring a server-supplied `Retry-After`
//! hint, up to the configured attempt budget. All other faults propagate
//! immediately as typed failures.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use pilot_core::retry::{backoff_delay, parse_retry_after};
use pilot_core::{PilotError, RetryConfig};

/// Default whole-request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Typed client for the Pilot agent service.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    retry: RetryConfig,
}

/// Error body shape the service returns on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    /// Field → validation messages (422 only).
    #[serde(default)]
    errors: Option<HashMap<String, Vec<String>>>,
}

impl ApiClient {
    /// Create a client for a service base URL and API key.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, api_key, http)
    }

    /// Create a client sharing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            http,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Service base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an absolute URL under the service base.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and parse the JSON response body.
    pub(crate) async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, PilotError> {
        let response = self.send_checked(method, url, body, false).await?;
        response.json().await.map_err(|e| PilotError::Protocol {
            message: format!("invalid response body: {e}"),
            line: None,
        })
    }

    /// Send a request and discard the response body.
    pub(crate) async fn request_empty(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), PilotError> {
        let _ = self.send_checked(method, url, body, false).await?;
        Ok(())
    }

    /// Send a request, mapping failures onto the error taxonomy and
    /// retrying retryable ones with backoff.
    pub(crate) async fn send_checked(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
        event_stream: bool,
    ) -> Result<Response, PilotError> {
        let mut attempt = 0u32;
        loop {
            let mut request = self
                .http
                .request(method.clone(), url)
                .header("x-api-key", &self.api_key)
                .header("x-request-id", Uuid::now_v7().to_string());
            if event_stream {
                request = request.header(ACCEPT, "text/event-stream");
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => error_from_response(response).await,
                Err(e) => classify_transport(&e),
            };

            if error.is_retryable() && attempt < self.retry.max_retries {
                let delay = error
                    .retry_after()
                    .unwrap_or_else(|| backoff_delay(attempt, &self.retry, rand::random::<f64>()));
                warn!(
                    url,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            debug!(url, code = error.code(), "request failed");
            return Err(error);
        }
    }
}

/// Map a non-2xx response onto the error taxonomy.
async fn error_from_response(response: Response) -> PilotError {
    let status = response.status();
    let path = response.url().path().to_owned();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body: ApiErrorBody = response.json().await.unwrap_or_default();
    let message = body.message.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned()
    });

    match status {
        StatusCode::UNAUTHORIZED => PilotError::Auth { message },
        StatusCode::FORBIDDEN => PilotError::PermissionDenied { message },
        StatusCode::NOT_FOUND => PilotError::NotFound { resource: path },
        StatusCode::UNPROCESSABLE_ENTITY => PilotError::Validation {
            errors: body.errors.unwrap_or_default(),
        },
        StatusCode::TOO_MANY_REQUESTS => PilotError::RateLimited {
            message,
            retry_after,
        },
        status => PilotError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

/// Map a `reqwest` transport fault onto the error taxonomy.
fn classify_transport(error: &reqwest::Error) -> PilotError {
    if error.is_timeout() {
        PilotError::Timeout {
            operation: "http request".into(),
            timeout_ms: u64::try_from(HTTP_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        PilotError::Connection {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_stripped() {
        let client = ApiClient::new("https://api.example.com/", "key");
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(client.url("/sessions"), "https://api.example.com/sessions");
    }

    #[test]
    fn error_body_parses_validation_map() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"message":"invalid","errors":{"goal":["must not be empty"]}}"#,
        )
        .unwrap();
        assert_eq!(body.message.as_deref(), Some("invalid"));
        assert_eq!(body.errors.unwrap()["goal"], vec!["must not be empty"]);
    }

    #[test]
    fn error_body_tolerates_unknown_shape() {
        let body: ApiErrorBody = serde_json::from_str(r#"{"detail":"weird"}"#).unwrap();
        assert!(body.message.is_none());
        assert!(body.errors.is_none());
    }
}
