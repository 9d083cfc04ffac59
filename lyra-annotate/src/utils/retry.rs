//! Retry policy with pluggable backoff
//!
//! Wraps any fallible async operation. The policy owns only the attempt counter; each attempt
//! is built fresh by the caller's closure, so attempts share no other state.
//!
//! **Algorithm:**
//! 1. Attempt operation (attempt numbers start at 1)
//! 2. If successful, return result
//! 3. On failure with attempts remaining: log WARN, sleep `backoff.delay_after(attempt)`, retry
//! 4. On failure with no attempts remaining: return [`RetryExhausted`] with the last error

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Same delay after every failed attempt
    Fixed(Duration),
    /// `attempt * step` after failed attempt `attempt`
    Linear(Duration),
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step.saturating_mul(attempt),
        }
    }
}

/// Bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (0 is treated as 1)
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    /// 3 attempts, waiting 1s then 2s
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(1))
    }
}

/// All attempts failed
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub const fn linear(max_attempts: u32, step: Duration) -> Self {
        Self::new(max_attempts, Backoff::Linear(step))
    }

    /// Attempts that will actually run
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds or attempts run out
    ///
    /// # Arguments
    /// * `operation_name` - Name for logging (e.g., "annotate chunk 3")
    /// * `operation` - Closure receiving the 1-based attempt number
    pub async fn run<F, Fut, T, E>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if attempt >= max_attempts => {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Operation failed: attempts exhausted"
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                Err(err) => {
                    let delay = self.backoff.delay_after(attempt);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "Operation failed, will retry after backoff"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_linear_backoff_schedule() {
        let backoff = Backoff::Linear(Duration::from_secs(1));
        assert_eq!(backoff.delay_after(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_after(2), Duration::from_secs(2));
        assert_eq!(Backoff::None.delay_after(5), Duration::ZERO);
        assert_eq!(
            Backoff::Fixed(Duration::from_millis(7)).delay_after(9),
            Duration::from_millis(7)
        );
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let policy = RetryPolicy::new(3, Backoff::None);
        let result = policy
            .run("test_op", |_| async { Ok::<i32, String>(42) })
            .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let policy = RetryPolicy::new(3, Backoff::None);
        let mut calls = Vec::new();

        let result = policy
            .run("test_op", |attempt| {
                calls.push(attempt);
                async move {
                    if attempt < 3 {
                        Err(format!("failure {attempt}"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(3, Backoff::None);
        let mut calls = 0;

        let result = policy
            .run("test_op", |attempt| {
                calls += 1;
                async move { Err::<(), String>(format!("failure {attempt}")) }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(calls, 3);
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "failure 3");
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Backoff::None);
        let mut calls = 0;

        let _ = policy
            .run("test_op", |_| {
                calls += 1;
                async { Err::<(), &str>("nope") }
            })
            .await;

        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_linear_backoff_waits_between_attempts() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(20));
        let start = Instant::now();

        let _ = policy
            .run("test_op", |_| async { Err::<(), &str>("nope") })
            .await;

        // 20ms after attempt 1, 40ms after attempt 2, none after the last
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
