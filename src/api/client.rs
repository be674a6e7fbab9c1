use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::util::{validate_base_url, UrlValidationError};

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Non-2xx response carrying an `{ "error": ... }` payload
    #[error("Server rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),
}

impl ApiError {
    /// Returns true if this error is transient and the request should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::HttpStatus(status) | ApiError::Rejected { status, .. } => *status >= 500,
            ApiError::RateLimited(_)
            | ApiError::ResponseTooLarge(_)
            | ApiError::Decode(_)
            | ApiError::InvalidUrl(_) => false,
        }
    }
}

/// Error body shape shared by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: String,
}

/// JSON-over-HTTP client for the recommendations and interaction API.
///
/// Cheap to clone. Every request is bounded by `timeout` (send and body
/// read together) and by a 5MB response cap. Transient failures are retried
/// with exponential backoff (`retry_delay`, doubled each attempt).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<Arc<SecretString>>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: validate_base_url(base_url)?,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = Self::new(&config.api_base_url)?
            .with_timeout(config.request_timeout())
            .with_max_retries(config.max_retries);
        Ok(match config.api_token() {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(Arc::new(token));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append percent-encoded path segments to the base URL.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| UrlValidationError::NotABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let bytes = self.execute(Method::GET, url, None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST a JSON body. Only used for idempotent writes, so retrying is safe.
    pub(crate) async fn post_json<B, T>(&self, url: &Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        let bytes = self.execute(Method::POST, url, Some(&body)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn execute(
        &self,
        method: Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, ApiError> {
        let mut retry_count = 0;

        loop {
            match self.attempt(&method, url, body).await {
                Ok(bytes) => return Ok(bytes),
                Err(ApiError::RateLimited(_)) if retry_count >= self.max_retries => {
                    return Err(ApiError::RateLimited(retry_count));
                }
                Err(e)
                    if retry_count < self.max_retries
                        && (e.is_retryable() || matches!(e, ApiError::RateLimited(_))) =>
                {
                    let delay = self.retry_delay.saturating_mul(1u32 << retry_count.min(16));
                    tracing::warn!(
                        error = %e,
                        url = %url,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying API request after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, ApiError> {
        tokio::time::timeout(self.timeout, self.send_and_read(method, url, body))
            .await
            .map_err(|_| ApiError::Timeout)?
    }

    async fn send_and_read(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, ApiError> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(ACCEPT, "application/json");

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }
        if let Some(token) = &self.token {
            tracing::trace!("API authentication configured");
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited(0));
        }

        if !status.is_success() {
            // Best effort: surface the server's reason when it sent one.
            let message = read_limited_bytes(response, MAX_RESPONSE_SIZE)
                .await
                .ok()
                .and_then(|bytes| serde_json::from_slice::<ErrorPayload>(&bytes).ok())
                .map(|payload| payload.error);
            return Err(match message {
                Some(message) => ApiError::Rejected {
                    status: status.as_u16(),
                    message,
                },
                None => ApiError::HttpStatus(status.as_u16()),
            });
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
