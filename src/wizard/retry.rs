//! Caller-side retry for flow calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::FlowError;

/// How often and how patiently to retry a retryable flow failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, given the failure of `attempt`
    /// (1-based). A backend-supplied `retry_after` wins over the schedule.
    ///
    /// Never longer than `max_delay`. `None` when the backend asks for a
    /// longer wait than that, in which case the caller should give up.
    pub fn delay_for(&self, attempt: u32, err: &FlowError) -> Option<Duration> {
        if let Some(after) = err.retry_after() {
            return (after <= self.max_delay).then_some(after);
        }
        let exp = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        let jitter_ms = (backoff.as_millis() as u64) / 4;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        Some((backoff + Duration::from_millis(jitter)).min(self.max_delay))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. Only transient `BackendUnavailable`
/// failures are retried.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Result<T, FlowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FlowError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if attempt > 1 {
            debug!(attempt, max_attempts, "Retrying flow call");
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                warn!(attempt, error = %err, "Giving up after retries");
                return Err(err);
            }
            Err(err) => {
                let Some(delay) = policy.delay_for(attempt, &err) else {
                    warn!(
                        attempt,
                        retry_after = ?err.retry_after(),
                        max_delay_ms = policy.max_delay.as_millis() as u64,
                        error = %err,
                        "Backend asked for a longer wait than allowed, giving up"
                    );
                    return Err(err);
                };
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retryable flow failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable(retry_after: Option<Duration>) -> FlowError {
        FlowError::BackendUnavailable {
            provider: "gemini".into(),
            message: "HTTP 503".into(),
            retry_after,
            transient: true,
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn delay_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        let err = unavailable(None);
        let first = policy.delay_for(1, &err).unwrap();
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        let second = policy.delay_for(2, &err).unwrap();
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(250));
        // Jitter never pushes past the cap
        for attempt in 3..=10 {
            assert_eq!(policy.delay_for(attempt, &err), Some(Duration::from_millis(300)));
        }
    }

    #[test]
    fn retry_after_wins() {
        let policy = RetryPolicy::default();
        let err = unavailable(Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(1, &err), Some(Duration::from_secs(2)));
    }

    #[test]
    fn retry_after_beyond_cap_gives_up() {
        let policy = RetryPolicy::default();
        let err = unavailable(Some(Duration::from_secs(86_400)));
        assert_eq!(policy.delay_for(1, &err), None);
    }

    #[tokio::test]
    async fn long_retry_after_fails_without_sleeping() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = tokio::time::timeout(
            Duration::from_secs(1),
            retry(&RetryPolicy::default(), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(unavailable(Some(Duration::from_secs(86_400))))
            }),
        )
        .await
        .expect("retry slept instead of giving up");
        assert_eq!(
            result.unwrap_err().retry_after(),
            Some(Duration::from_secs(86_400))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_backend_failures_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry(&fast(), move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 { Err(unavailable(None)) } else { Ok(n) }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_attempt_limit() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry(&fast(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(unavailable(None))
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "backend_unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_key_is_tried_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry(&fast(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(crate::error::LlmError::AuthFailed {
                provider: "gemini".into(),
            }
            .into())
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "backend_unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry(&fast(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(FlowError::schema("SuggestionList", "bad json"))
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "schema_violation");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
