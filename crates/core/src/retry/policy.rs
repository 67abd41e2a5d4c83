//! Bounded, classified, cancellable retries.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metrics::RETRY_ATTEMPTS;

use super::config::RetryConfig;

/// Failure classification used by [`RetryPolicy`].
pub trait Retryable {
    /// Whether another attempt could succeed.
    /// Timeouts, 5xx and dropped connections are retryable; rejected
    /// credentials and malformed requests are not.
    fn is_retryable(&self) -> bool;
}

/// A successful value plus how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Why a retried operation did not produce a value.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Failure classified as terminal; no further attempts were made.
    #[error("terminal failure on attempt {attempts}: {error}")]
    Terminal { error: E, attempts: u32 },

    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {error}")]
    Exhausted { error: E, attempts: u32 },

    /// Cancellation was requested before the operation completed.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// Attempts started before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Terminal { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// The last underlying error, if the operation was not cancelled.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Terminal { error, .. } | Self::Exhausted { error, .. } => Some(error),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Exponential backoff: the k-th retry waits `base_delay * 2^(k-1)`,
/// capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.base_delay(), config.max_delay())
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay after the `failures`-th consecutive failure (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32
            .checked_shl(failures - 1)
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Every delay the policy would sleep through if all attempts fail.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|k| self.delay_for(k)).collect()
    }

    /// Run `op` until it succeeds, fails terminally, runs out of retries,
    /// or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. Cancellation is checked
    /// before each attempt and raced against both the in-flight attempt and
    /// the backoff sleep, so a cancelled run never starts another attempt.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(operation, attempt, "Cancelled during attempt");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                result = op(attempt) => result,
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempts = attempt, "Succeeded after retry");
                    }
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                warn!(operation, attempt, error = %error, "Terminal failure, not retrying");
                return Err(RetryError::Terminal {
                    error,
                    attempts: attempt,
                });
            }

            if attempt > self.max_retries {
                warn!(operation, attempts = attempt, error = %error, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    error,
                    attempts: attempt,
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, backing off"
            );
            RETRY_ATTEMPTS.with_label_values(&[operation]).inc();

            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(operation, attempt, "Cancelled during backoff");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Transient => write!(f, "transient"),
                Self::Fatal => write!(f, "fatal"),
            }
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(5))
    }

    #[test]
    fn test_delay_sequence() {
        assert_eq!(
            policy().schedule(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
        assert_eq!(policy.delay_for(0), Duration::ZERO);
    }

    #[test]
    fn test_max_delay_never_below_base() {
        let policy = RetryPolicy::new(2, Duration::from_millis(500), Duration::from_millis(10));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let cancel = CancellationToken::new();
        let result = policy()
            .run("test", &cancel, |_| async { Ok::<_, TestError>(7) })
            .await
            .unwrap();
        assert_eq!(result, Attempted { value: 7, attempts: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let cancel = CancellationToken::new();
        let result = policy()
            .run("test", &cancel, |attempt| async move {
                if attempt < 3 {
                    Err(TestError::Transient)
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(result.attempts, 3);
        assert_eq!(result.value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_not_retried() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);

        let err = policy()
            .run("test", &cancel, move |_| {
                *counter.lock().unwrap() += 1;
                async { Err::<(), _>(TestError::Fatal) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Terminal { attempts: 1, .. }));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_retries_with_exact_backoff() {
        let cancel = CancellationToken::new();
        let instants = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&instants);

        let err = policy()
            .run("test", &cancel, move |_| {
                recorder.lock().unwrap().push(Instant::now());
                async { Err::<(), _>(TestError::Transient) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Exhausted { attempts: 4, .. }));
        assert_eq!(err.last_error(), Some(&TestError::Transient));

        let instants = instants.lock().unwrap();
        let gaps: Vec<_> = instants.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = policy()
            .run("test", &cancel, move |_| {
                *counter.lock().unwrap() += 1;
                async { Err::<(), _>(TestError::Transient) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Cancelled { attempts: 1 }));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = policy()
            .run("test", &cancel, |_| async { Ok::<_, TestError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { attempts: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_policy() {
        let cancel = CancellationToken::new();
        let err = RetryPolicy::no_retry()
            .run("test", &cancel, |_| async { Err::<(), _>(TestError::Transient) })
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 1, .. }));
    }
}
