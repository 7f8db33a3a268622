//! Retry policy: failure classification, bounded backoff, and an explicit
//! attempt state machine.
//!
//! ```text
//! pending → success
//!         → retrying → pending   (re-entrant up to the attempt cap)
//!         → failed
//! ```
//!
//! Transient failures back off exponentially (base × 2^attempt, capped,
//! with jitter); auth failures fail fast and are fatal; malformed
//! responses fail fast but only for that one operation. The state machine
//! is a pure function over [`ErrorClass`], testable without any I/O.

use std::time::Duration;

use fiscus_config::LimitsConfig;

use crate::error::{CrmError, ErrorClass};

/// Attempt state for one retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// An attempt is about to run.
    Pending,
    /// Attempt `failures` failed transiently; backing off before the next.
    Retrying { failures: u32 },
    /// The operation produced a value.
    Succeeded,
    /// Non-retryable failure, or the attempt cap was exceeded.
    Failed,
}

/// Bounded exponential backoff parameters.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn from_limits(limits: &LimitsConfig) -> Self {
        Self {
            max_attempts: limits.retry_max_attempts,
            base_delay: Duration::from_millis(limits.retry_base_delay_ms),
            max_delay: Duration::from_millis(limits.retry_max_delay_ms),
        }
    }

    /// Transition from `state` after a failed attempt of class `class`.
    #[must_use]
    pub const fn next_state(&self, state: RetryState, class: ErrorClass) -> RetryState {
        let failures = match state {
            RetryState::Pending => 1,
            RetryState::Retrying { failures } => failures + 1,
            RetryState::Succeeded | RetryState::Failed => return RetryState::Failed,
        };
        match class {
            ErrorClass::Fatal | ErrorClass::PerOperation => RetryState::Failed,
            ErrorClass::Transient => {
                if failures < self.max_attempts {
                    RetryState::Retrying { failures }
                } else {
                    RetryState::Failed
                }
            }
        }
    }

    /// Backoff before retry number `failures` (1-based), jittered into
    /// `[delay/2, delay]` so synchronized workers spread out.
    #[must_use]
    pub fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        let uncapped = self.base_delay.saturating_mul(2u32.saturating_pow(exp));
        let capped = uncapped.min(self.max_delay);
        let half = capped / 2;
        half + half.mul_f64(jitter_fraction())
    }
}

/// A value that took `retries` extra attempts to obtain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub retries: u32,
}

/// Drive `op` through the retry state machine.
///
/// A rate-limited rejection waits for the server-advertised `Retry-After`
/// when it exceeds the computed backoff.
///
/// # Errors
///
/// Returns the last failure once the state machine reaches `Failed`.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<Attempted<T>, CrmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CrmError>>,
{
    let mut state = RetryState::Pending;
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(Attempted { value, retries }),
            Err(e) => {
                state = policy.next_state(state, e.classify());
                match state {
                    RetryState::Retrying { failures } => {
                        let mut delay = policy.backoff(failures);
                        if let CrmError::RateLimited { retry_after_secs } = &e {
                            delay = delay.max(Duration::from_secs(*retry_after_secs));
                        }
                        tracing::debug!(
                            failures,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "transient failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        retries += 1;
                    }
                    RetryState::Failed => return Err(e),
                    RetryState::Pending | RetryState::Succeeded => unreachable!(),
                }
            }
        }
    }
}

/// Uniform fraction in `[0, 1]` from OS randomness; 0.5 if the OS source
/// is unavailable.
fn jitter_fraction() -> f64 {
    let mut bytes = [0u8; 8];
    if getrandom::fill(&mut bytes).is_err() {
        return 0.5;
    }
    u64::from_le_bytes(bytes) as f64 / u64::MAX as f64
}
