//! Bounded retry with configurable backoff
//!
//! The report task wraps each complete attempt in [`with_retry_notify`]. An attempt that fails
//! with a retryable error is re-run from scratch after the backoff delay, up to
//! `max_attempts` retries beyond the first attempt.
//!
//! # Example
//!
//! ```no_run
//! use daily_basket::retry::{IsRetryable, with_retry};
//! use daily_basket::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = with_retry(&config, |attempt| async move {
//!     tracing::info!(attempt, "working");
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Configuration is fixed for the life of the process
            Error::Config { .. } => false,
            // Everything else that can fail inside an attempt (remote API, report files,
            // recipient lookup, mail dispatch) may succeed on a later attempt
            Error::TaskExecutionFailed(_)
            | Error::Report(_)
            | Error::Mail(_)
            | Error::Network(_)
            | Error::Io(_)
            | Error::Database(_)
            | Error::Sqlx(_)
            | Error::Serialization(_)
            | Error::NotFound(_)
            | Error::Validation(_)
            | Error::Duplicate(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => true,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or retries run out
///
/// `operation` receives the 1-based attempt number.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    with_retry_notify(config, operation, |_, _, _| {}).await
}

/// Like [`with_retry`], calling `on_retry(error, next_attempt, delay)` before each backoff
pub async fn with_retry_notify<F, Fut, T, E, N>(
    config: &RetryConfig,
    mut operation: F,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
    N: FnMut(&E, u32, Duration),
{
    let mut retries = 0;
    let mut delay = config.initial_delay;

    loop {
        let attempt = retries + 1;
        match operation(attempt).await {
            Ok(result) => {
                if retries > 0 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && retries < config.max_attempts => {
                retries += 1;

                let wait = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_retries = config.max_attempts,
                    delay_ms = wait.as_millis(),
                    "Operation failed, retrying"
                );
                on_retry(&e, attempt + 1, wait);

                // The failed attempt's error is dropped before sleeping
                drop(e);
                tokio::time::sleep(wait).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result is uniformly distributed between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
