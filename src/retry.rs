use std::time::Duration;

/// Bounded-retry schedule for a fallible asynchronous operation.
///
/// The policy is pure configuration: it answers "may attempt N run, and after
/// what delay" and holds no per-operation state. Attempt counting and the
/// one-attempt-in-flight rule live with the caller (the load coordinator),
/// which is what prevents two concurrent retries for the same logical asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first. Zero means a single attempt.
    pub max_retries: u32,
    /// Wait between a failure and the next attempt.
    pub retry_delay: Duration,
}

/// Final outcome of a retried operation whose every attempt failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: String,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Total attempts the policy permits.
    pub const fn max_attempts(self) -> u32 {
        self.max_retries + 1
    }

    /// Delay to observe before attempt number `attempts_made + 1`.
    ///
    /// Returns `None` once the budget is exhausted. The first attempt runs
    /// immediately; every re-attempt waits `retry_delay`.
    pub fn delay_before_next_attempt(self, attempts_made: u32) -> Option<Duration> {
        if attempts_made >= self.max_attempts() {
            return None;
        }
        if attempts_made == 0 {
            Some(Duration::ZERO)
        } else {
            Some(self.retry_delay)
        }
    }

    /// Whether a failure observed after `attempts_made` attempts may retry.
    pub fn allows_retry_after(self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts()
    }
}

/// Drive a synchronous fallible operation under this policy, sleeping through
/// `sleep` between attempts. Used where a host has no event loop of its own;
/// the load coordinator schedules the same decisions against its timer queue
/// instead of blocking.
pub fn run_with_retry<T, F, S>(policy: RetryPolicy, mut op: F, mut sleep: S) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Result<T, String>,
    S: FnMut(Duration),
{
    let mut attempts_made = 0;
    loop {
        let attempt = attempts_made + 1;
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(last_error) => {
                attempts_made = attempt;
                if !policy.allows_retry_after(attempts_made) {
                    return Err(RetryExhausted {
                        attempts: attempts_made,
                        last_error,
                    });
                }
                sleep(policy.retry_delay);
            }
        }
    }
}
