use std::thread::sleep;
use std::time::Duration;

use tracing::warn;

/// Exponential backoff settings for rerunning a whole export.
///
/// The delay starts at `base_delay` and doubles after each failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt as i32);
        self.base_delay.mul_f64(factor)
    }

    /// Run `op` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the retry budget is spent.
    pub fn run<T, E, F, R>(&self, mut op: F, is_retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(val) => return Ok(val),
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    warn!(attempt = attempt + 1, ?delay, error = %e, "Retrying export");
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }
}
