use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Fixed-Delay Retry Strategy
// ============================================================================
//
// Runs a fallible async operation up to `max_attempts` times, sleeping a fixed
// `delay` between attempts. A classifier decides which errors are worth
// another attempt; anything it rejects is returned at once, with no delay.
//
// The sleep only suspends the calling task.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Pause between two consecutive attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The classifier marked the error as permanent; no further attempts were made.
    Permanent(E),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Permanent(e) => write!(f, "{}", e),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "operation failed after {} attempts: {}", attempts, last)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Permanent(e) => e.source(),
            RetryError::Exhausted { last, .. } => Some(last),
        }
    }
}

/// Execute an operation, retrying errors for which `is_retryable` returns true.
pub async fn retry_with_classifier<F, Fut, T, E, C>(
    config: &RetryConfig,
    is_retryable: C,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    C: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !is_retryable(&error) {
                    tracing::debug!(
                        error = %error,
                        "Permanent failure, not retrying"
                    );
                    return Err(RetryError::Permanent(error));
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        attempt = attempt,
                        error = %error,
                        "Operation failed after all retries"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }

                tracing::warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %error,
                    delay_ms = config.delay.as_millis() as u64,
                    "Transient failure, retrying after delay"
                );

                sleep(config.delay).await;
            }
        }
    }
}
