//! Bounded retry logic for transient download failures
//!
//! Asset downloads are retried with the same URL up to a fixed total number
//! of tries; each failure logs the remaining try count. There is no
//! exponential backoff; the number of tries is small and bounded.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, non-success HTTP status)
/// should return `true`. Permanent failures (corrupt data, ledger errors,
/// chapter-scoped failures) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Network-level failures are transient
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            // A reachable server returning a non-success status may recover
            Error::HttpStatus { .. } => true,
            // Connection-shaped I/O errors are transient
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Everything else is handled by the orchestrator, not the retry loop
            Error::SourceUnavailable(_)
            | Error::Chapter(_)
            | Error::Archive(_)
            | Error::Ledger(_)
            | Error::Feed(_)
            | Error::Serialization(_)
            | Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with a bounded retry budget
///
/// # Arguments
///
/// * `config` - Retry configuration (total attempts, delay, jitter)
/// * `operation` - Async closure returning `Result<T, E>` where `E`
///   implements [`IsRetryable`]
///
/// # Returns
///
/// The successful result, or the last error once the budget is exhausted or
/// a non-retryable error occurs.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    remaining = max_attempts - attempt,
                    "download failed, retrying"
                );
                tokio::time::sleep(attempt_delay(config)).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "download failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "non-retryable error, not retrying");
                }
                return Err(e);
            }
        }
    }

    unreachable!("retry loop returns from its final iteration")
}

/// The delay before the next attempt, with up to +50% jitter when enabled
fn attempt_delay(config: &RetryConfig) -> Duration {
    if !config.jitter || config.delay.is_zero() {
        return config.delay;
    }
    let factor = rand::thread_rng().gen_range(1.0..1.5);
    Duration::from_secs_f64(config.delay.as_secs_f64() * factor)
}
