//! Fetch Module
//!
//! Retrying HTTP request pipeline.
//!
//! # Data Flow
//! ```text
//! execute(request)
//!     → resolve URL and headers once
//!     → transport.rs (one attempt)
//!     → fetcher.rs (classify: success / terminal / retryable)
//!     → backoff.rs (jittered delay, then next attempt)
//! ```

pub mod backoff;
mod fetcher;
mod transport;

pub use backoff::Jitter;
pub use fetcher::{
    is_terminal_status, AttemptOutcome, Execution, ResilientFetcher, RetryAttempt, RetryConfig,
    RetryState, RETRY_ATTEMPT_HEADER, TERMINAL_STATUSES,
};
pub use transport::{
    FetchRequest, PreparedRequest, RawResponse, ReqwestTransport, Transport, TransportError,
};
