//! Resilient Fetcher
//!
//! Executes one logical request with retries on an exponential backoff
//! schedule with jitter.
//!
//! # State Transitions
//! ```text
//! Attempting → Succeeded:        success status
//! Attempting → FailedTerminal:   400, 401, 403, 404, 405, 422 (any attempt)
//! Attempting → Waiting:          transport failure or other status, budget left
//! Attempting → FailedExhausted:  transport failure or other status, budget spent
//! Waiting    → Attempting:       backoff elapsed
//! ```

use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AttemptFailure, FetchError};
use crate::fetch::backoff::Jitter;
use crate::fetch::transport::{
    FetchRequest, PreparedRequest, RawResponse, ReqwestTransport, Transport, TransportError,
};

/// Statuses for which retrying cannot change the outcome
pub const TERMINAL_STATUSES: [u16; 6] = [400, 401, 403, 404, 405, 422];

/// Header carrying the retry number on every attempt after the first
pub const RETRY_ATTEMPT_HEADER: &str = "x-retry-attempt";

pub fn is_terminal_status(status: u16) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

// == Retry Config ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

// == Attempt Record ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    TerminalFailure,
}

/// One attempt of a logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 0 for the first attempt
    pub attempt_number: u32,
    /// Backoff waited before this attempt
    pub delay_ms: u64,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Waiting,
    Succeeded,
    FailedTerminal,
    FailedExhausted,
}

impl RetryState {
    pub fn is_final(self) -> bool {
        matches!(
            self,
            RetryState::Succeeded | RetryState::FailedTerminal | RetryState::FailedExhausted
        )
    }
}

/// Result of a logical request together with its attempt history.
#[derive(Debug)]
pub struct Execution {
    pub result: Result<RawResponse, FetchError>,
    pub attempts: Vec<RetryAttempt>,
    /// Final state, or None if the request was invalid and never sent
    pub state: Option<RetryState>,
}

// == Classification ==
enum Classified {
    Success(RawResponse),
    Retryable(AttemptFailure),
    Terminal { status: u16, reason: String },
}

impl Classified {
    fn outcome(&self) -> AttemptOutcome {
        match self {
            Classified::Success(_) => AttemptOutcome::Success,
            Classified::Retryable(_) => AttemptOutcome::RetryableFailure,
            Classified::Terminal { .. } => AttemptOutcome::TerminalFailure,
        }
    }
}

fn classify(result: Result<RawResponse, TransportError>) -> Classified {
    match result {
        Ok(response) if response.is_success() => Classified::Success(response),
        Ok(response) if is_terminal_status(response.status) => Classified::Terminal {
            status: response.status,
            reason: response.reason,
        },
        Ok(response) => Classified::Retryable(AttemptFailure::Status {
            status: response.status,
            reason: response.reason,
        }),
        Err(e) => Classified::Retryable(AttemptFailure::Transport(e.0)),
    }
}

// == Resilient Fetcher ==
/// Request executor with bounded, jittered exponential backoff.
///
/// Holds no per-request state; concurrent `execute` calls are independent.
#[derive(Debug)]
pub struct ResilientFetcher<T = ReqwestTransport> {
    transport: T,
    base_url: String,
    config: RetryConfig,
    jitter: Jitter,
}

impl ResilientFetcher<ReqwestTransport> {
    /// Builds a reqwest-backed fetcher from runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let transport = ReqwestTransport::new(Some(timeout))
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self::new(transport, config.api_base_url.clone(), config.retry()))
    }
}

impl<T: Transport> ResilientFetcher<T> {
    pub fn new(transport: T, base_url: impl Into<String>, config: RetryConfig) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            config,
            jitter: Jitter::from_entropy(),
        }
    }

    /// Replaces the jitter source with a deterministic one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.jitter = Jitter::seeded(seed);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // == Fetch JSON ==
    /// Executes `request` and parses the success body as JSON.
    ///
    /// A body that does not parse is a [`FetchError::Decode`] and is not retried.
    pub async fn fetch_json<R: DeserializeOwned>(
        &self,
        request: &FetchRequest,
    ) -> Result<R, FetchError> {
        let response = self.execute(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// GETs `endpoint` and parses the body as JSON.
    pub async fn get_json<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, FetchError> {
        self.fetch_json(&FetchRequest::get(endpoint)).await
    }

    // == Execute ==
    /// Executes `request`, retrying retryable failures.
    pub async fn execute(&self, request: &FetchRequest) -> Result<RawResponse, FetchError> {
        self.execute_recorded(request).await.result
    }

    /// Like [`execute`](Self::execute), also returning every attempt made.
    pub async fn execute_recorded(&self, request: &FetchRequest) -> Execution {
        let mut attempts = Vec::new();
        let mut state = RetryState::Attempting;

        let (url, headers) = match self.resolve(request) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(endpoint = %request.endpoint, error = %e, "Request not sent");
                return Execution {
                    result: Err(e),
                    attempts,
                    state: None,
                };
            }
        };

        let mut attempt: u32 = 0;
        let mut delay_ms: u64 = 0;

        let result = loop {
            debug!(url = %url, attempt, ?state, "Sending request");

            let prepared = prepare(request, &url, &headers, attempt);
            let classified = classify(self.transport.send(prepared).await);
            attempts.push(RetryAttempt {
                attempt_number: attempt,
                delay_ms,
                outcome: classified.outcome(),
            });

            match classified {
                Classified::Success(response) => {
                    state = RetryState::Succeeded;
                    break Ok(response);
                }
                Classified::Terminal { status, reason } => {
                    state = RetryState::FailedTerminal;
                    warn!(url = %url, attempt, status, "Request rejected, not retrying");
                    break Err(FetchError::Terminal { status, reason });
                }
                Classified::Retryable(failure) => {
                    if attempt >= self.config.max_retries {
                        state = RetryState::FailedExhausted;
                        warn!(
                            url = %url,
                            attempts = attempt + 1,
                            error = %failure,
                            "Retry budget exhausted"
                        );
                        break Err(FetchError::Exhausted {
                            attempts: attempt + 1,
                            last: failure,
                        });
                    }

                    state = RetryState::Waiting;
                    let backoff = self.jitter.backoff(
                        attempt,
                        self.config.base_delay_ms,
                        self.config.max_delay_ms,
                    );
                    delay_ms = backoff.as_millis() as u64;
                    info!(
                        url = %url,
                        ?state,
                        attempt = attempt + 1,
                        delay_ms,
                        error = %failure,
                        "Retrying request"
                    );
                    tokio::time::sleep(backoff).await;

                    attempt += 1;
                    state = RetryState::Attempting;
                }
            }
        };

        Execution {
            result,
            attempts,
            state: Some(state),
        }
    }

    /// Resolves the URL and validates caller headers once, before any attempt.
    fn resolve(
        &self,
        request: &FetchRequest,
    ) -> Result<(Url, Vec<(HeaderName, HeaderValue)>), FetchError> {
        let raw = if request.endpoint.starts_with("http://")
            || request.endpoint.starts_with("https://")
        {
            request.endpoint.clone()
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = request.endpoint.trim_start_matches('/');
            format!("{}/{}", base, path)
        };
        let url = Url::parse(&raw)
            .map_err(|e| FetchError::InvalidRequest(format!("bad URL '{}': {}", raw, e)))?;

        let mut headers = Vec::with_capacity(request.headers.len() + 1);
        if !request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
        {
            headers.push((CONTENT_TYPE, HeaderValue::from_static("application/json")));
        }
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FetchError::InvalidRequest(format!("bad header '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                FetchError::InvalidRequest(format!("bad value for '{}': {}", name, e))
            })?;
            headers.push((name, value));
        }

        Ok((url, headers))
    }
}

fn prepare(
    request: &FetchRequest,
    url: &Url,
    headers: &[(HeaderName, HeaderValue)],
    attempt: u32,
) -> PreparedRequest {
    let mut headers = headers.to_vec();
    if attempt > 0 {
        headers.push((
            HeaderName::from_static(RETRY_ATTEMPT_HEADER),
            HeaderValue::from(attempt),
        ));
    }
    PreparedRequest {
        method: request.method.clone(),
        url: url.clone(),
        headers,
        body: request.body.clone(),
    }
}
