//! Retry policy and the retry loop used around external calls

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::DomainError;

/// Fixed-delay retry policy with a hard per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: u32,
    inter_attempt_delay: Duration,
    per_attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            inter_attempt_delay: Duration::from_millis(1000),
            per_attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        inter_attempt_delay: Duration,
        per_attempt_timeout: Duration,
    ) -> Result<Self, DomainError> {
        if max_attempts == 0 {
            return Err(DomainError::configuration(
                "Retry policy requires at least one attempt",
            ));
        }

        if per_attempt_timeout.is_zero() {
            return Err(DomainError::configuration(
                "Retry policy requires a positive per-attempt timeout",
            ));
        }

        Ok(Self {
            max_attempts,
            inter_attempt_delay,
            per_attempt_timeout,
        })
    }

    pub fn from_millis(max_attempts: u32, delay_ms: u64, timeout_ms: u64) -> Result<Self, DomainError> {
        Self::new(
            max_attempts,
            Duration::from_millis(delay_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn inter_attempt_delay(&self) -> Duration {
        self.inter_attempt_delay
    }

    pub fn per_attempt_timeout(&self) -> Duration {
        self.per_attempt_timeout
    }
}

/// Runs `operation` under `policy`
///
/// Each attempt is bounded by the per-attempt timeout; a timed-out attempt is
/// dropped (aborting the in-flight call) and counts as a transient failure.
/// Retryable failures wait the fixed delay and try again. Non-retryable errors
/// return immediately. After the last attempt the last error is returned as is.
///
/// The operation receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, DomainError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let mut attempt = 1;

    loop {
        let outcome = match timeout(policy.per_attempt_timeout, operation(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::transient(
                "timeout",
                format!(
                    "{} timed out after {}ms",
                    operation_name,
                    policy.per_attempt_timeout.as_millis()
                ),
            )),
        };

        let error = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() || attempt >= policy.max_attempts {
            warn!(
                operation = operation_name,
                attempt,
                max_attempts = policy.max_attempts,
                error = %error,
                "Giving up"
            );
            return Err(error);
        }

        warn!(
            operation = operation_name,
            attempt,
            max_attempts = policy.max_attempts,
            error = %error,
            "Attempt failed, retrying"
        );

        if !policy.inter_attempt_delay.is_zero() {
            tokio::time::sleep(policy.inter_attempt_delay).await;
        }

        attempt += 1;
    }
}
